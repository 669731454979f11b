//! Record and alias storage consumed by the resolver and the alias registry.
//!
//! [`NameRecordStore`] is the narrow capability the rest of the gateway
//! depends on. Two backends are provided: [`MemoryRecordStore`] for tests and
//! ephemeral deployments, and [`SledRecordStore`] for a persistent embedded
//! database. Both make [`NameRecordStore::bind_alias`] a single atomic step.

use async_trait::async_trait;
use ensgw_types::{Address, AliasEntry, Bytes, NameRecord, WILDCARD_LABEL};

pub mod memory;
pub mod persistent;
pub mod seed;

pub use memory::MemoryRecordStore;
pub use persistent::SledRecordStore;
pub use seed::{load_seed_file, seed_store, SeedRecords};

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("alias '{alias}' is already bound")]
    Conflict { alias: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Transient failures the caller may retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Abstract record store.
///
/// Absent records and absent fields are `Ok(None)`, never errors; callers
/// map them to the zero value of the answer type.
#[async_trait]
pub trait NameRecordStore: Send + Sync {
    /// Exact record for `name`, without wildcard fallback.
    async fn get_record(&self, name: &str) -> StoreResult<Option<NameRecord>>;

    async fn put_record(&self, name: &str, record: NameRecord) -> StoreResult<()>;

    async fn get_alias_for_owner(&self, owner: &Address) -> StoreResult<Option<String>>;

    /// True if `alias` is bound to any owner or its name record exists.
    async fn alias_exists(&self, alias: &str) -> StoreResult<bool>;

    /// Bind `alias` to `owner`, releasing `previous_alias` in the same step.
    ///
    /// Fails with [`StoreError::Conflict`] without changing any state when
    /// the alias belongs to another owner or `previous_alias` is not the
    /// owner's current binding.
    async fn bind_alias(
        &self,
        owner: &Address,
        alias: &str,
        previous_alias: Option<&str>,
    ) -> StoreResult<()>;

    async fn list_aliases(&self) -> StoreResult<Vec<AliasEntry>>;

    /// Record for `name`, falling back to `*.parent` when none exists.
    async fn find_record(&self, name: &str) -> StoreResult<Option<NameRecord>> {
        if let Some(record) = self.get_record(name).await? {
            return Ok(Some(record));
        }
        match wildcard_key(name) {
            Some(key) => self.get_record(&key).await,
            None => Ok(None),
        }
    }

    async fn get_address(&self, name: &str, coin_type: u64) -> StoreResult<Option<Address>> {
        Ok(self
            .find_record(name)
            .await?
            .and_then(|record| record.address(coin_type)))
    }

    async fn get_text(&self, name: &str, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .find_record(name)
            .await?
            .and_then(|record| record.text.get(key).cloned()))
    }

    async fn get_contenthash(&self, name: &str) -> StoreResult<Option<Bytes>> {
        Ok(self
            .find_record(name)
            .await?
            .and_then(|record| record.contenthash))
    }
}

/// `*.parent` key for a name with at least two labels.
pub fn wildcard_key(name: &str) -> Option<String> {
    let (label, parent) = name.split_once('.')?;
    if label == WILDCARD_LABEL || parent.is_empty() {
        return None;
    }
    Some(format!("{WILDCARD_LABEL}.{parent}"))
}

/// Name under which an alias's record is stored.
pub fn alias_record_name(alias: &str, alias_domain: &str) -> String {
    format!("{alias}.{alias_domain}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_key_replaces_leftmost_label() {
        assert_eq!(wildcard_key("sub.test.eth").as_deref(), Some("*.test.eth"));
        assert_eq!(wildcard_key("test.eth").as_deref(), Some("*.eth"));
        assert_eq!(wildcard_key("eth"), None);
        assert_eq!(wildcard_key("*.test.eth"), None);
    }

    #[test]
    fn alias_records_live_under_domain() {
        assert_eq!(alias_record_name("alice", "loogies.eth"), "alice.loogies.eth");
    }
}
