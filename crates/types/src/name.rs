//! ENS names: normalization and namehash.
//!
//! A [`Name`] is always in normalized form. Normalization follows the
//! UTS-46 mapping (lower-casing, compatibility folding) used by ENS clients,
//! and a name is accepted only if normalizing it is a no-op, so one logical
//! name has exactly one byte representation and one namehash.

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Label used by wildcard records (`*.example.eth`).
pub const WILDCARD_LABEL: &str = "*";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("name is not in normalized form: {name}")]
    NotNormalized { name: String },
    #[error("name contains an empty label: {name}")]
    EmptyLabel { name: String },
    #[error("name cannot be normalized: {name}")]
    Invalid { name: String },
}

/// Map a name to its normalized form.
pub fn normalize(name: &str) -> Result<String, NameError> {
    if name.is_empty() {
        return Ok(String::new());
    }
    let (mapped, result) = idna::domain_to_unicode(name);
    if result.is_err() {
        return Err(NameError::Invalid {
            name: name.to_string(),
        });
    }
    Ok(mapped)
}

/// True when `name` is already equal to its own normalization.
pub fn is_normalized(name: &str) -> bool {
    matches!(normalize(name), Ok(normalized) if normalized == name)
}

/// `keccak256` of a single label.
pub fn labelhash(label: &str) -> B256 {
    keccak256(label.as_bytes())
}

/// Recursive ENS namehash (EIP-137).
///
/// `namehash("") = 0x00..00` and
/// `namehash(label.rest) = keccak256(namehash(rest) || keccak256(label))`.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    let mut buf = [0u8; 64];
    for label in name.rsplit('.') {
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(labelhash(label).as_slice());
        node = keccak256(buf);
    }
    node
}

/// A normalized, dot-separated domain name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Accept `name` only if it is already normalized.
    pub fn parse(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        if !name.is_empty() && name.split('.').any(str::is_empty) {
            return Err(NameError::EmptyLabel { name });
        }
        if !is_normalized(&name) {
            return Err(NameError::NotNormalized { name });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Name {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Name::parse(value)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
