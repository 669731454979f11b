//! Off-chain record shape served by the gateway.

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SLIP-44 coin type of Ether, used by the single-argument `addr(bytes32)`.
pub const ETH_COIN_TYPE: u64 = 60;

/// Returned for a missing address.
pub const ZERO_ADDRESS: Address = Address::ZERO;

/// Record stored for one fully qualified name.
///
/// Every field is optional in storage; lookups on missing fields resolve to
/// the zero value of the answer type rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    /// Coin type → address.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub addresses: BTreeMap<u64, Address>,
    /// Text record key → value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub text: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contenthash: Option<Bytes>,
}

impl NameRecord {
    /// Record created for a claimed alias: only the ETH address is set.
    pub fn for_owner(owner: Address) -> Self {
        let mut record = Self::default();
        record.addresses.insert(ETH_COIN_TYPE, owner);
        record
    }

    pub fn address(&self, coin_type: u64) -> Option<Address> {
        self.addresses.get(&coin_type).copied()
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.text.get(key).map(String::as_str)
    }

    pub fn contenthash(&self) -> Option<&Bytes> {
        self.contenthash.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.text.is_empty() && self.contenthash.is_none()
    }
}
