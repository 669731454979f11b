//! Response signing for the off-chain resolver contract.
//!
//! The contract verifies `ecrecover(digest, sig)` against its configured
//! signer set, where
//!
//! ```text
//! digest = keccak256(0x19 0x00 || sender || validUntil (u64, big endian)
//!                    || keccak256(request) || keccak256(result))
//! ```

use crate::errors::{GatewayError, Result};
use alloy_primitives::{keccak256, Address, Bytes, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolValue;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Holds the gateway key and produces signed responses.
#[derive(Clone)]
pub struct ResponseSigner {
    signer: PrivateKeySigner,
}

impl ResponseSigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Parse a 32-byte hex private key, with or without `0x`.
    pub fn from_hex(key: &str) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(key.trim())
            .map_err(|err| GatewayError::InvalidSigningKey(err.to_string()))?;
        Ok(Self::new(signer))
    }

    /// Address the resolver contract must trust.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Digest the contract recomputes when verifying a response.
    pub fn digest(sender: &Address, valid_until: u64, request: &[u8], result: &[u8]) -> B256 {
        let mut preimage = Vec::with_capacity(2 + 20 + 8 + 32 + 32);
        preimage.extend_from_slice(&[0x19, 0x00]);
        preimage.extend_from_slice(sender.as_slice());
        preimage.extend_from_slice(&valid_until.to_be_bytes());
        preimage.extend_from_slice(keccak256(request).as_slice());
        preimage.extend_from_slice(keccak256(result).as_slice());
        keccak256(&preimage)
    }

    /// Sign `result` with an expiry of `now + ttl`.
    pub fn sign_at(
        &self,
        now: u64,
        sender: &Address,
        request: &[u8],
        result: Bytes,
        ttl: u64,
    ) -> Result<SignedResponse> {
        let valid_until = now.saturating_add(ttl);
        let digest = Self::digest(sender, valid_until, request, &result);
        let signature = self
            .signer
            .sign_hash_sync(&digest)
            .map_err(|err| GatewayError::Signing(err.to_string()))?;

        Ok(SignedResponse {
            result,
            valid_until,
            signature: signature.as_bytes(),
        })
    }

    /// Sign `result` against the current wall clock.
    pub fn sign(
        &self,
        sender: &Address,
        request: &[u8],
        result: Bytes,
        ttl: u64,
    ) -> Result<SignedResponse> {
        self.sign_at(unix_now(), sender, request, result, ttl)
    }
}

impl fmt::Debug for ResponseSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// A signed answer, ready to be returned as `abi.encode(bytes,uint64,bytes)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedResponse {
    pub result: Bytes,
    pub valid_until: u64,
    /// `r || s || v` with `v` in {27, 28}.
    pub signature: [u8; SIGNATURE_LENGTH],
}

impl SignedResponse {
    pub fn abi_encode(&self) -> Bytes {
        let envelope = (
            self.result.clone(),
            self.valid_until,
            Bytes::copy_from_slice(&self.signature),
        );
        Bytes::from(envelope.abi_encode_params())
    }

    /// `0x`-prefixed hex of [`SignedResponse::abi_encode`].
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.abi_encode()))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
