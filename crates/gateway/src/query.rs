//! Resolution request decoding, validation and record lookup.

use crate::abi::{
    IAddrResolver, IAddressResolver, IContentHashResolver, IResolverService, ITextResolver,
};
use crate::dns;
use crate::errors::{GatewayError, Result};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use ensgw_storage::{NameRecordStore, StoreResult};
use ensgw_types::{is_normalized, namehash, ETH_COIN_TYPE, ZERO_ADDRESS};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// TTL applied to every answer unless configured otherwise.
pub const DEFAULT_RECORD_TTL_SECS: u64 = 300;
/// Upper bound on a single store call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

const ADDR_SELECTOR: [u8; 4] = IAddrResolver::addrCall::SELECTOR;
const ADDR_COIN_SELECTOR: [u8; 4] = IAddressResolver::addrCall::SELECTOR;
const TEXT_SELECTOR: [u8; 4] = ITextResolver::textCall::SELECTOR;
const CONTENTHASH_SELECTOR: [u8; 4] = IContentHashResolver::contenthashCall::SELECTOR;

/// The record queries the gateway answers, decoded from the inner calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverQuery {
    /// `addr(bytes32)`, implicitly coin type 60.
    Addr { node: B256 },
    /// `addr(bytes32,uint256)`
    AddrByCoinType { node: B256, coin_type: U256 },
    /// `text(bytes32,string)`
    Text { node: B256, key: String },
    /// `contenthash(bytes32)`
    Contenthash { node: B256 },
}

impl ResolverQuery {
    /// Decode an inner resolver call by its selector.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| GatewayError::BadInnerEncoding {
                function: "<none>",
                reason: format!("calldata of {} bytes has no selector", data.len()),
            })?;

        let bad = |function: &'static str| {
            move |err: alloy_sol_types::Error| GatewayError::BadInnerEncoding {
                function,
                reason: err.to_string(),
            }
        };

        match selector {
            ADDR_SELECTOR => {
                let call = IAddrResolver::addrCall::abi_decode(data)
                    .map_err(bad(IAddrResolver::addrCall::SIGNATURE))?;
                Ok(ResolverQuery::Addr { node: call.node })
            }
            ADDR_COIN_SELECTOR => {
                let call = IAddressResolver::addrCall::abi_decode(data)
                    .map_err(bad(IAddressResolver::addrCall::SIGNATURE))?;
                Ok(ResolverQuery::AddrByCoinType {
                    node: call.node,
                    coin_type: call.coinType,
                })
            }
            TEXT_SELECTOR => {
                let call = ITextResolver::textCall::abi_decode(data)
                    .map_err(bad(ITextResolver::textCall::SIGNATURE))?;
                Ok(ResolverQuery::Text {
                    node: call.node,
                    key: call.key,
                })
            }
            CONTENTHASH_SELECTOR => {
                let call = IContentHashResolver::contenthashCall::abi_decode(data)
                    .map_err(bad(IContentHashResolver::contenthashCall::SIGNATURE))?;
                Ok(ResolverQuery::Contenthash { node: call.node })
            }
            other => Err(GatewayError::UnsupportedFunction { selector: other }),
        }
    }

    /// Namehash the caller claims to be asking about.
    pub fn node(&self) -> B256 {
        match self {
            ResolverQuery::Addr { node }
            | ResolverQuery::AddrByCoinType { node, .. }
            | ResolverQuery::Text { node, .. }
            | ResolverQuery::Contenthash { node } => *node,
        }
    }

    /// Canonical Solidity signature of the matched function.
    pub fn signature(&self) -> &'static str {
        match self {
            ResolverQuery::Addr { .. } => IAddrResolver::addrCall::SIGNATURE,
            ResolverQuery::AddrByCoinType { .. } => IAddressResolver::addrCall::SIGNATURE,
            ResolverQuery::Text { .. } => ITextResolver::textCall::SIGNATURE,
            ResolverQuery::Contenthash { .. } => IContentHashResolver::contenthashCall::SIGNATURE,
        }
    }
}

/// A looked-up value, typed by the return type of the function that asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAnswer {
    /// `returns (address)`
    Address(Address),
    /// `returns (bytes)` carrying an address
    AddressBytes(Bytes),
    /// `returns (string)`
    Text(String),
    /// `returns (bytes)` carrying a content hash
    Contenthash(Bytes),
}

impl RecordAnswer {
    /// ABI-encode as the function's return data.
    pub fn abi_encode(&self) -> Bytes {
        let encoded = match self {
            RecordAnswer::Address(address) => address.abi_encode(),
            RecordAnswer::AddressBytes(bytes) | RecordAnswer::Contenthash(bytes) => {
                bytes.abi_encode()
            }
            RecordAnswer::Text(text) => text.abi_encode(),
        };
        Bytes::from(encoded)
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub name: String,
    pub query: ResolverQuery,
    pub answer: RecordAnswer,
    /// ABI-encoded answer.
    pub result: Bytes,
    pub ttl: u64,
}

/// Decodes `resolve(bytes,bytes)` calldata and answers it from the store.
#[derive(Clone)]
pub struct QueryDispatcher {
    store: Arc<dyn NameRecordStore>,
    ttl: u64,
    io_timeout: Duration,
}

impl QueryDispatcher {
    pub fn new(store: Arc<dyn NameRecordStore>, ttl: u64) -> Self {
        Self {
            store,
            ttl,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Decode and validate `calldata`, then look up and encode the answer.
    ///
    /// The store is not touched unless the name is normalized and matches
    /// the namehash in the inner call.
    pub async fn resolve(&self, calldata: &[u8]) -> Result<Resolution> {
        let call = IResolverService::resolveCall::abi_decode(calldata).map_err(|err| {
            GatewayError::BadOuterEncoding {
                reason: err.to_string(),
            }
        })?;

        let name = dns::decode(&call.name)?;
        let query = ResolverQuery::decode(&call.data)?;

        if !is_normalized(&name) {
            warn!(name = %name, "rejected request for non-normalized name");
            return Err(GatewayError::NameNotNormalized { name });
        }

        let computed = namehash(&name);
        if computed != query.node() {
            warn!(
                name = %name,
                requested = %query.node(),
                computed = %computed,
                "rejected request with mismatched namehash"
            );
            return Err(GatewayError::NamehashMismatch {
                name,
                requested: query.node(),
                computed,
            });
        }

        let answer = self.answer(&name, &query).await?;
        let result = answer.abi_encode();
        debug!(name = %name, function = query.signature(), "resolved query");

        Ok(Resolution {
            name,
            query,
            answer,
            result,
            ttl: self.ttl,
        })
    }

    async fn answer(&self, name: &str, query: &ResolverQuery) -> Result<RecordAnswer> {
        let answer = match query {
            ResolverQuery::Addr { .. } => {
                let address = self
                    .bounded(self.store.get_address(name, ETH_COIN_TYPE))
                    .await?;
                RecordAnswer::Address(address.unwrap_or(ZERO_ADDRESS))
            }
            ResolverQuery::AddrByCoinType { coin_type, .. } => {
                let address = match u64::try_from(*coin_type) {
                    Ok(coin_type) => self.bounded(self.store.get_address(name, coin_type)).await?,
                    Err(_) => None,
                };
                let address = address.unwrap_or(ZERO_ADDRESS);
                RecordAnswer::AddressBytes(Bytes::copy_from_slice(address.as_slice()))
            }
            ResolverQuery::Text { key, .. } => {
                let value = self.bounded(self.store.get_text(name, key)).await?;
                RecordAnswer::Text(value.unwrap_or_default())
            }
            ResolverQuery::Contenthash { .. } => {
                let contenthash = self.bounded(self.store.get_contenthash(name)).await?;
                RecordAnswer::Contenthash(contenthash.unwrap_or_default())
            }
        };
        Ok(answer)
    }

    async fn bounded<T>(&self, fut: impl Future<Output = StoreResult<T>>) -> Result<T> {
        match timeout(self.io_timeout, fut).await {
            Ok(result) => result.map_err(GatewayError::from),
            Err(_) => Err(GatewayError::StoreTimeout),
        }
    }
}

impl fmt::Debug for QueryDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDispatcher")
            .field("ttl", &self.ttl)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}
