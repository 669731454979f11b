//! Bulk record import from a JSON document of the form
//! `{ "test.eth": { "addresses": {...}, "text": {...}, "contenthash": "0x..." } }`.

use crate::{NameRecordStore, StoreError, StoreResult};
use ensgw_types::NameRecord;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub type SeedRecords = BTreeMap<String, NameRecord>;

pub fn load_seed_file<P: AsRef<Path>>(path: P) -> StoreResult<SeedRecords> {
    let path = path.as_ref();
    let raw = std::fs::read(path).map_err(|err| {
        StoreError::Unavailable(format!("failed to read seed file {}: {err}", path.display()))
    })?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Write every record, overwriting existing entries. Returns the count.
pub async fn seed_store(store: &dyn NameRecordStore, records: SeedRecords) -> StoreResult<usize> {
    let total = records.len();
    for (name, record) in records {
        store.put_record(&name, record).await?;
    }
    info!(total, "seeded name records");
    Ok(total)
}
