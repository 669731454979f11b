use crate::{alias_record_name, NameRecordStore, StoreError, StoreResult};
use async_trait::async_trait;
use ensgw_types::{Address, AliasEntry, NameRecord, DEFAULT_ALIAS_DOMAIN};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tracing::debug;

/// Sled-backed implementation
///
/// Layout:
/// - `records`: name → JSON [`NameRecord`]
/// - `owner_aliases`: 20-byte owner → alias
/// - `alias_owners`: alias → 20-byte owner (the set of all `owner:alias` pairs)
pub struct SledRecordStore {
    db: Db,
    records: Tree,
    owner_aliases: Tree,
    alias_owners: Tree,
    alias_domain: String,
}

impl SledRecordStore {
    pub fn new<P: AsRef<Path>>(path: P, alias_domain: impl Into<String>) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db, alias_domain)
    }

    /// Throwaway database, deleted on drop.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db, DEFAULT_ALIAS_DOMAIN)
    }

    fn from_db(db: Db, alias_domain: impl Into<String>) -> StoreResult<Self> {
        let records = db.open_tree("records")?;
        let owner_aliases = db.open_tree("owner_aliases")?;
        let alias_owners = db.open_tree("alias_owners")?;
        Ok(Self {
            db,
            records,
            owner_aliases,
            alias_owners,
            alias_domain: alias_domain.into(),
        })
    }

    pub fn alias_domain(&self) -> &str {
        &self.alias_domain
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode_alias(raw: &[u8]) -> StoreResult<String> {
    String::from_utf8(raw.to_vec())
        .map_err(|err| StoreError::Unavailable(format!("corrupt alias entry: {err}")))
}

fn decode_owner(raw: &[u8]) -> StoreResult<Address> {
    if raw.len() != 20 {
        return Err(StoreError::Unavailable("corrupt owner entry".to_string()));
    }
    Ok(Address::from_slice(raw))
}

#[async_trait]
impl NameRecordStore for SledRecordStore {
    async fn get_record(&self, name: &str) -> StoreResult<Option<NameRecord>> {
        self.records
            .get(name.as_bytes())?
            .map(|v| serde_json::from_slice(&v))
            .transpose()
            .map_err(Into::into)
    }

    async fn put_record(&self, name: &str, record: NameRecord) -> StoreResult<()> {
        let data = serde_json::to_vec(&record)?;
        self.records.insert(name.as_bytes(), data)?;
        Ok(())
    }

    async fn get_alias_for_owner(&self, owner: &Address) -> StoreResult<Option<String>> {
        self.owner_aliases
            .get(owner.as_slice())?
            .map(|v| decode_alias(&v))
            .transpose()
    }

    async fn alias_exists(&self, alias: &str) -> StoreResult<bool> {
        if self.alias_owners.contains_key(alias.as_bytes())? {
            return Ok(true);
        }
        let record_name = alias_record_name(alias, &self.alias_domain);
        Ok(self.records.contains_key(record_name.as_bytes())?)
    }

    async fn bind_alias(
        &self,
        owner: &Address,
        alias: &str,
        previous_alias: Option<&str>,
    ) -> StoreResult<()> {
        let record_name = alias_record_name(alias, &self.alias_domain);
        let previous_record = previous_alias.map(|prev| alias_record_name(prev, &self.alias_domain));
        let record = serde_json::to_vec(&NameRecord::for_owner(*owner))?;
        let conflict = || {
            ConflictableTransactionError::Abort(StoreError::Conflict {
                alias: alias.to_string(),
            })
        };

        let result = (&self.records, &self.owner_aliases, &self.alias_owners).transaction(
            |(records, owner_aliases, alias_owners)| {
                let current = owner_aliases.get(owner.as_slice())?;
                if current.as_deref() != previous_alias.map(str::as_bytes) {
                    return Err(conflict());
                }
                if previous_alias == Some(alias) {
                    return Ok(());
                }
                if alias_owners.get(alias.as_bytes())?.is_some()
                    || records.get(record_name.as_bytes())?.is_some()
                {
                    return Err(conflict());
                }

                if let (Some(prev), Some(prev_record)) = (previous_alias, &previous_record) {
                    alias_owners.remove(prev.as_bytes())?;
                    records.remove(prev_record.as_bytes())?;
                }
                owner_aliases.insert(owner.as_slice(), alias.as_bytes())?;
                alias_owners.insert(alias.as_bytes(), owner.as_slice())?;
                records.insert(record_name.as_bytes(), record.as_slice())?;
                Ok(())
            },
        );

        match result {
            Ok(()) => {
                debug!(%owner, alias, "alias bound");
                Ok(())
            }
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(err)) => Err(err.into()),
        }
    }

    async fn list_aliases(&self) -> StoreResult<Vec<AliasEntry>> {
        let mut entries = Vec::new();
        for item in self.alias_owners.iter() {
            let (alias, owner) = item?;
            entries.push(AliasEntry::new(decode_owner(&owner)?, decode_alias(&alias)?));
        }
        Ok(entries)
    }
}
