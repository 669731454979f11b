use alloy_primitives::Address;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use ensgw_alias_registry::{AliasError, AliasRegistry, ClaimMessage, OpenMembershipService};
use ensgw_storage::{MemoryRecordStore, NameRecordStore, SledRecordStore};
use std::sync::Arc;

fn signed_claim(signer: &PrivateKeySigner, alias: &str) -> (Address, String) {
    let owner = signer.address();
    let message = ClaimMessage::new(&owner, alias).to_json().unwrap();
    let signature = signer.sign_message_sync(message.as_bytes()).unwrap();
    (owner, format!("0x{}", hex::encode(signature.as_bytes())))
}

async fn contend(store: Arc<dyn NameRecordStore>) -> (usize, usize) {
    let registry = Arc::new(AliasRegistry::new(store, Arc::new(OpenMembershipService)));
    let claimants: Vec<_> = (0..6)
        .map(|_| signed_claim(&PrivateKeySigner::random(), "buidl"))
        .collect();

    let tasks = claimants.into_iter().map(|(owner, signature)| {
        let registry = registry.clone();
        tokio::spawn(async move { registry.claim(&owner, "buidl", &signature).await })
    });

    let mut wins = 0;
    let mut taken = 0;
    for result in futures::future::join_all(tasks).await {
        match result.expect("task panicked") {
            Ok(alias) => {
                assert_eq!(alias, "buidl");
                wins += 1;
            }
            Err(AliasError::AliasTaken { .. }) => taken += 1,
            Err(other) => panic!("unexpected claim error: {other}"),
        }
    }
    (wins, taken)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_on_memory_store_have_one_winner() {
    let store = Arc::new(MemoryRecordStore::default());
    assert_eq!(contend(store.clone()).await, (1, 5));
    assert_eq!(store.list_aliases().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_on_sled_store_have_one_winner() {
    let store = Arc::new(SledRecordStore::temporary().unwrap());
    assert_eq!(contend(store.clone()).await, (1, 5));
    assert_eq!(store.list_aliases().await.unwrap().len(), 1);
}
