//! Error types for alias claims

use ensgw_storage::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AliasError {
    #[error("alias must be between {min} and {max} characters, got {length}")]
    InvalidAliasLength {
        length: usize,
        min: usize,
        max: usize,
    },

    #[error("invalid alias '{alias}': {reason}")]
    InvalidAlias { alias: String, reason: String },

    #[error("invalid signature: {0}")]
    BadSignature(String),

    #[error("address {address} is not a member")]
    NotAuthorized { address: String },

    #[error("membership service unavailable: {0}")]
    MembershipUnavailable(String),

    #[error("alias '{alias}' is already taken")]
    AliasTaken { alias: String },

    #[error("record store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AliasError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { alias } => AliasError::AliasTaken { alias },
            other => AliasError::Store(other),
        }
    }
}

impl AliasError {
    /// Stable label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AliasError::InvalidAliasLength { .. } => "invalid_alias_length",
            AliasError::InvalidAlias { .. } => "invalid_alias",
            AliasError::BadSignature(_) => "bad_signature",
            AliasError::NotAuthorized { .. } => "not_authorized",
            AliasError::MembershipUnavailable(_) => "membership_unavailable",
            AliasError::AliasTaken { .. } => "alias_taken",
            AliasError::Store(_) => "store_unavailable",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AliasError::InvalidAliasLength { .. }
                | AliasError::InvalidAlias { .. }
                | AliasError::BadSignature(_)
                | AliasError::AliasTaken { .. }
        )
    }

    /// Backend failures; the claim may succeed if retried later.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            AliasError::MembershipUnavailable(_) | AliasError::Store(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AliasError>;
