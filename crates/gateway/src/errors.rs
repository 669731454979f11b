//! Error types for request decoding, lookup and signing

use alloy_primitives::B256;
use ensgw_storage::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("malformed DNS-encoded name: {reason}")]
    MalformedName { reason: String },

    #[error("calldata is not a valid resolve(bytes,bytes) call: {reason}")]
    BadOuterEncoding { reason: String },

    #[error("invalid arguments for {function}: {reason}")]
    BadInnerEncoding {
        function: &'static str,
        reason: String,
    },

    #[error("unsupported query function 0x{}", hex::encode(selector))]
    UnsupportedFunction { selector: [u8; 4] },

    #[error("name must be normalised: {name}")]
    NameNotNormalized { name: String },

    #[error("name {name} does not match namehash {requested} (expected {computed})")]
    NamehashMismatch {
        name: String,
        requested: B256,
        computed: B256,
    },

    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("record store did not answer in time")]
    StoreTimeout,

    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("failed to sign response: {0}")]
    Signing(String),
}

impl GatewayError {
    /// Stable label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::MalformedName { .. } => "malformed_name",
            GatewayError::BadOuterEncoding { .. } => "bad_outer_encoding",
            GatewayError::BadInnerEncoding { .. } => "bad_inner_encoding",
            GatewayError::UnsupportedFunction { .. } => "unsupported_function",
            GatewayError::NameNotNormalized { .. } => "name_not_normalized",
            GatewayError::NamehashMismatch { .. } => "namehash_mismatch",
            GatewayError::Store(_) | GatewayError::StoreTimeout => "store_unavailable",
            GatewayError::InvalidSigningKey(_) | GatewayError::Signing(_) => "signing",
        }
    }

    /// The request itself is at fault; retrying it unchanged cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GatewayError::MalformedName { .. }
                | GatewayError::BadOuterEncoding { .. }
                | GatewayError::BadInnerEncoding { .. }
                | GatewayError::UnsupportedFunction { .. }
                | GatewayError::NameNotNormalized { .. }
                | GatewayError::NamehashMismatch { .. }
        )
    }

    /// The request broke a name-binding invariant. These may come from a
    /// malicious or broken caller and are logged separately.
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            GatewayError::NameNotNormalized { .. } | GatewayError::NamehashMismatch { .. }
        )
    }

    /// Transient backend failures that are safe to retry.
    pub fn is_unavailable(&self) -> bool {
        match self {
            GatewayError::Store(err) => err.is_transient(),
            GatewayError::StoreTimeout => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
