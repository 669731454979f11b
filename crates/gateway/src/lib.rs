//! CCIP-Read (EIP-3668) gateway for off-chain ENS names.
//!
//! A client that hits an `OffchainLookup` revert on the resolver contract
//! forwards the `resolve(bytes,bytes)` calldata here. The gateway
//! decodes it, checks that the name is normalized and matches the queried
//! namehash, answers from the record store and signs the answer so the
//! contract's callback can verify it.

use alloy_primitives::Address;
use metrics::counter;
use tracing::{debug, warn};

pub mod abi;
pub mod dns;
pub mod errors;
pub mod query;
pub mod signer;

pub use errors::*;
pub use query::{
    QueryDispatcher, RecordAnswer, Resolution, ResolverQuery, DEFAULT_IO_TIMEOUT,
    DEFAULT_RECORD_TTL_SECS,
};
pub use signer::{ResponseSigner, SignedResponse, SIGNATURE_LENGTH};

/// Resolution plus signing behind a single call.
#[derive(Clone, Debug)]
pub struct CcipGateway {
    dispatcher: QueryDispatcher,
    signer: ResponseSigner,
}

impl CcipGateway {
    pub fn new(dispatcher: QueryDispatcher, signer: ResponseSigner) -> Self {
        Self { dispatcher, signer }
    }

    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    pub fn ttl(&self) -> u64 {
        self.dispatcher.ttl()
    }

    /// Answer a `resolve(bytes,bytes)` call made on behalf of `sender`.
    pub async fn handle(&self, sender: &Address, calldata: &[u8]) -> Result<SignedResponse> {
        counter!("ensgw_resolve_requests_total").increment(1);

        let outcome = self.resolve_and_sign(sender, calldata).await;
        if let Err(err) = &outcome {
            counter!("ensgw_resolve_failures_total", "kind" => err.kind()).increment(1);
            if err.is_client_error() {
                debug!(%sender, error = %err, "rejected resolve request");
            } else {
                warn!(%sender, error = %err, "resolve request failed");
            }
        }
        outcome
    }

    async fn resolve_and_sign(&self, sender: &Address, calldata: &[u8]) -> Result<SignedResponse> {
        let resolution = self.dispatcher.resolve(calldata).await?;
        let Resolution {
            name, query, result, ttl, ..
        } = resolution;
        let response = self.signer.sign(sender, calldata, result, ttl)?;
        debug!(
            name = %name,
            function = query.signature(),
            valid_until = response.valid_until,
            "signed resolve response"
        );
        Ok(response)
    }
}
