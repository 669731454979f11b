use alloy_primitives::{address, Address, Bytes, Signature};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use ensgw_gateway::abi::{IAddrResolver, IResolverService, ITextResolver};
use ensgw_gateway::{dns, CcipGateway, GatewayError, QueryDispatcher, ResponseSigner};
use ensgw_storage::{MemoryRecordStore, NameRecordStore, StoreError, StoreResult};
use ensgw_types::{namehash, AliasEntry, NameRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const GATEWAY_KEY: &str = "c99d1fec66736e414a9a0e5b9771bc12eb0214552944dda994a8e5dfece9cdf1";
const GATEWAY_ADDRESS: Address = address!("c8169b7C197f2FCE14D1f5760611266227DA0B80");
const RESOLVER: Address = address!("8464135c8F25Da09e49BC8782676a84730C318bC");

fn resolve_calldata(name: &str, inner: Vec<u8>) -> Vec<u8> {
    IResolverService::resolveCall {
        name: dns::encode(name).unwrap().into(),
        data: inner.into(),
    }
    .abi_encode()
}

fn gateway(store: Arc<dyn NameRecordStore>) -> CcipGateway {
    CcipGateway::new(
        QueryDispatcher::new(store, 300).with_io_timeout(Duration::from_millis(200)),
        ResponseSigner::from_hex(GATEWAY_KEY).unwrap(),
    )
}

/// Counts every store call and can be told to hang or fail.
#[derive(Default)]
struct InstrumentedStore {
    inner: MemoryRecordStore,
    lookups: AtomicUsize,
    hang: bool,
    fail: bool,
}

impl InstrumentedStore {
    async fn touch(&self) -> StoreResult<()> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.fail {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl NameRecordStore for InstrumentedStore {
    async fn get_record(&self, name: &str) -> StoreResult<Option<NameRecord>> {
        self.touch().await?;
        self.inner.get_record(name).await
    }

    async fn put_record(&self, name: &str, record: NameRecord) -> StoreResult<()> {
        self.inner.put_record(name, record).await
    }

    async fn get_alias_for_owner(&self, owner: &Address) -> StoreResult<Option<String>> {
        self.touch().await?;
        self.inner.get_alias_for_owner(owner).await
    }

    async fn alias_exists(&self, alias: &str) -> StoreResult<bool> {
        self.touch().await?;
        self.inner.alias_exists(alias).await
    }

    async fn bind_alias(
        &self,
        owner: &Address,
        alias: &str,
        previous_alias: Option<&str>,
    ) -> StoreResult<()> {
        self.touch().await?;
        self.inner.bind_alias(owner, alias, previous_alias).await
    }

    async fn list_aliases(&self) -> StoreResult<Vec<AliasEntry>> {
        self.touch().await?;
        self.inner.list_aliases().await
    }
}

#[tokio::test]
async fn signed_addr_response_verifies_against_gateway_key() {
    let owner = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    let store = MemoryRecordStore::default();
    store
        .put_record("test.eth", NameRecord::for_owner(owner))
        .await
        .unwrap();
    let gateway = gateway(Arc::new(store));
    assert_eq!(gateway.signer_address(), GATEWAY_ADDRESS);

    let calldata = resolve_calldata(
        "test.eth",
        IAddrResolver::addrCall {
            node: namehash("test.eth"),
        }
        .abi_encode(),
    );
    let response = gateway.handle(&RESOLVER, &calldata).await.unwrap();

    let (result, valid_until, sig) =
        <(Bytes, u64, Bytes)>::abi_decode_params(&response.abi_encode()).unwrap();
    assert_eq!(Address::abi_decode(&result).unwrap(), owner);

    let digest = ResponseSigner::digest(&RESOLVER, valid_until, &calldata, &result);
    let signature = Signature::from_raw(&sig).unwrap();
    assert_eq!(
        signature.recover_address_from_prehash(&digest).unwrap(),
        GATEWAY_ADDRESS
    );
}

#[tokio::test]
async fn wildcard_record_answers_subnames() {
    let mut record = NameRecord::default();
    record.text.insert("email".into(), "wild@test.eth".into());
    let store = MemoryRecordStore::default();
    store.put_record("*.test.eth", record).await.unwrap();
    let gateway = gateway(Arc::new(store));

    let calldata = resolve_calldata(
        "anything.test.eth",
        ITextResolver::textCall {
            node: namehash("anything.test.eth"),
            key: "email".into(),
        }
        .abi_encode(),
    );
    let response = gateway.handle(&RESOLVER, &calldata).await.unwrap();
    assert_eq!(String::abi_decode(&response.result).unwrap(), "wild@test.eth");
}

#[tokio::test]
async fn non_normalized_name_never_reaches_the_store() {
    let store = Arc::new(InstrumentedStore::default());
    let gateway = gateway(store.clone());

    for name in ["Test.eth", "TEST.ETH", "ｔｅｓｔ.eth"] {
        let calldata = resolve_calldata(
            name,
            IAddrResolver::addrCall {
                node: namehash(name),
            }
            .abi_encode(),
        );
        let err = gateway.handle(&RESOLVER, &calldata).await.unwrap_err();
        assert!(
            matches!(err, GatewayError::NameNotNormalized { .. }),
            "{name}: {err}"
        );
    }
    assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn namehash_mismatch_never_reaches_the_store() {
    let store = Arc::new(InstrumentedStore::default());
    let gateway = gateway(store.clone());

    let calldata = resolve_calldata(
        "test.eth",
        IAddrResolver::addrCall {
            node: namehash("victim.eth"),
        }
        .abi_encode(),
    );
    let err = gateway.handle(&RESOLVER, &calldata).await.unwrap_err();
    assert!(matches!(err, GatewayError::NamehashMismatch { .. }));
    assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_store_is_reported_as_unavailable() {
    let store = Arc::new(InstrumentedStore {
        fail: true,
        ..Default::default()
    });
    let gateway = gateway(store);

    let calldata = resolve_calldata(
        "test.eth",
        IAddrResolver::addrCall {
            node: namehash("test.eth"),
        }
        .abi_encode(),
    );
    let err = gateway.handle(&RESOLVER, &calldata).await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn slow_store_times_out() {
    let store = Arc::new(InstrumentedStore {
        hang: true,
        ..Default::default()
    });
    let gateway = gateway(store);

    let calldata = resolve_calldata(
        "test.eth",
        IAddrResolver::addrCall {
            node: namehash("test.eth"),
        }
        .abi_encode(),
    );
    let err = gateway.handle(&RESOLVER, &calldata).await.unwrap_err();
    assert!(matches!(err, GatewayError::StoreTimeout));
}
