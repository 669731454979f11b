//! Alias bindings between owner addresses and human-readable labels.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Inclusive character bounds for a requested alias.
pub const MIN_ALIAS_LENGTH: usize = 3;
pub const MAX_ALIAS_LENGTH: usize = 64;

/// Default parent domain under which claimed aliases become resolvable.
pub const DEFAULT_ALIAS_DOMAIN: &str = "loogies.eth";

/// One `owner → alias` binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AliasEntry {
    pub address: Address,
    pub alias: String,
}

impl AliasEntry {
    pub fn new(address: Address, alias: impl Into<String>) -> Self {
        Self {
            address,
            alias: alias.into(),
        }
    }
}
