use crate::{alias_record_name, NameRecordStore, StoreError, StoreResult};
use async_trait::async_trait;
use ensgw_types::{Address, AliasEntry, NameRecord, DEFAULT_ALIAS_DOMAIN};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<String, NameRecord>,
    owner_aliases: HashMap<Address, String>,
    alias_owners: BTreeMap<String, Address>,
}

/// In-memory store. All alias indexes sit behind one lock so a bind is a
/// single critical section.
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    state: Arc<RwLock<MemoryState>>,
    alias_domain: String,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new(DEFAULT_ALIAS_DOMAIN)
    }
}

impl MemoryRecordStore {
    pub fn new(alias_domain: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            alias_domain: alias_domain.into(),
        }
    }

    pub fn alias_domain(&self) -> &str {
        &self.alias_domain
    }

    pub fn record_count(&self) -> usize {
        self.state.read().records.len()
    }
}

#[async_trait]
impl NameRecordStore for MemoryRecordStore {
    async fn get_record(&self, name: &str) -> StoreResult<Option<NameRecord>> {
        Ok(self.state.read().records.get(name).cloned())
    }

    async fn put_record(&self, name: &str, record: NameRecord) -> StoreResult<()> {
        self.state.write().records.insert(name.to_string(), record);
        Ok(())
    }

    async fn get_alias_for_owner(&self, owner: &Address) -> StoreResult<Option<String>> {
        Ok(self.state.read().owner_aliases.get(owner).cloned())
    }

    async fn alias_exists(&self, alias: &str) -> StoreResult<bool> {
        let state = self.state.read();
        Ok(state.alias_owners.contains_key(alias)
            || state
                .records
                .contains_key(&alias_record_name(alias, &self.alias_domain)))
    }

    async fn bind_alias(
        &self,
        owner: &Address,
        alias: &str,
        previous_alias: Option<&str>,
    ) -> StoreResult<()> {
        let conflict = || StoreError::Conflict {
            alias: alias.to_string(),
        };
        let mut state = self.state.write();

        if state.owner_aliases.get(owner).map(String::as_str) != previous_alias {
            return Err(conflict());
        }
        if previous_alias == Some(alias) {
            return Ok(());
        }
        let record_name = alias_record_name(alias, &self.alias_domain);
        if state.alias_owners.contains_key(alias) || state.records.contains_key(&record_name) {
            return Err(conflict());
        }

        if let Some(previous) = previous_alias {
            state.alias_owners.remove(previous);
            state
                .records
                .remove(&alias_record_name(previous, &self.alias_domain));
        }
        state.owner_aliases.insert(*owner, alias.to_string());
        state.alias_owners.insert(alias.to_string(), *owner);
        state
            .records
            .insert(record_name, NameRecord::for_owner(*owner));
        Ok(())
    }

    async fn list_aliases(&self) -> StoreResult<Vec<AliasEntry>> {
        Ok(self
            .state
            .read()
            .alias_owners
            .iter()
            .map(|(alias, owner)| AliasEntry::new(*owner, alias.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensgw_types::ETH_COIN_TYPE;

    fn owner(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[tokio::test]
    async fn missing_records_are_none() {
        let store = MemoryRecordStore::default();
        assert!(store.get_record("test.eth").await.unwrap().is_none());
        assert!(store.get_address("test.eth", 60).await.unwrap().is_none());
        assert!(store.get_text("test.eth", "url").await.unwrap().is_none());
        assert!(store.get_contenthash("test.eth").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wildcard_record_answers_subdomains() {
        let store = MemoryRecordStore::default();
        store
            .put_record("*.test.eth", NameRecord::for_owner(owner(7)))
            .await
            .unwrap();
        assert_eq!(
            store.get_address("anything.test.eth", ETH_COIN_TYPE).await.unwrap(),
            Some(owner(7))
        );
        assert!(store.get_address("test.eth", ETH_COIN_TYPE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bind_creates_alias_record_and_indexes() {
        let store = MemoryRecordStore::new("loogies.eth");
        store.bind_alias(&owner(1), "alice", None).await.unwrap();

        assert_eq!(
            store.get_alias_for_owner(&owner(1)).await.unwrap().as_deref(),
            Some("alice")
        );
        assert!(store.alias_exists("alice").await.unwrap());
        assert_eq!(
            store
                .get_address("alice.loogies.eth", ETH_COIN_TYPE)
                .await
                .unwrap(),
            Some(owner(1))
        );
        assert_eq!(
            store.list_aliases().await.unwrap(),
            vec![AliasEntry::new(owner(1), "alice")]
        );
    }

    #[tokio::test]
    async fn rebind_releases_previous_alias() {
        let store = MemoryRecordStore::default();
        store.bind_alias(&owner(1), "alice", None).await.unwrap();
        store
            .bind_alias(&owner(1), "alicia", Some("alice"))
            .await
            .unwrap();

        assert!(!store.alias_exists("alice").await.unwrap());
        assert!(store.alias_exists("alicia").await.unwrap());
        assert_eq!(store.list_aliases().await.unwrap().len(), 1);
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn bind_conflicts_leave_state_untouched() {
        let store = MemoryRecordStore::default();
        store.bind_alias(&owner(1), "alice", None).await.unwrap();

        let err = store.bind_alias(&owner(2), "alice", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        // stale previous alias
        let err = store
            .bind_alias(&owner(1), "bob", Some("carol"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        assert_eq!(
            store.list_aliases().await.unwrap(),
            vec![AliasEntry::new(owner(1), "alice")]
        );
        assert!(store.get_alias_for_owner(&owner(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn existing_record_blocks_alias() {
        let store = MemoryRecordStore::default();
        store
            .put_record("reserved.loogies.eth", NameRecord::default())
            .await
            .unwrap();
        assert!(store.alias_exists("reserved").await.unwrap());
        assert!(store.bind_alias(&owner(3), "reserved", None).await.is_err());
    }
}
