//! Alias registry
//!
//! Binds human-readable aliases to the addresses that signed for them. The
//! registry holds no locks of its own: uniqueness and the release of an
//! owner's previous alias are enforced by the store's atomic `bind_alias`.

use crate::errors::*;
use crate::membership::MembershipService;
use crate::types::{validate_alias, ClaimMessage};
use alloy_primitives::Address;
use ensgw_storage::{NameRecordStore, StoreError, StoreResult};
use ensgw_types::{encode_address, AliasEntry};
use metrics::counter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default bound on a single store or membership call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AliasRegistry {
    store: Arc<dyn NameRecordStore>,
    membership: Arc<dyn MembershipService>,
    io_timeout: Duration,
}

impl AliasRegistry {
    pub fn new(store: Arc<dyn NameRecordStore>, membership: Arc<dyn MembershipService>) -> Self {
        Self {
            store,
            membership,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Claim `alias` for `owner`, authenticated by a personal-message
    /// signature over [`ClaimMessage`].
    ///
    /// Re-claiming the alias the owner already holds returns it without
    /// touching the store. Claiming a different alias releases the old one.
    pub async fn claim(&self, owner: &Address, alias: &str, signature: &str) -> Result<String> {
        let outcome = self.try_claim(owner, alias, signature).await;
        let label = match &outcome {
            Ok(ClaimOutcome::Bound) => "bound",
            Ok(ClaimOutcome::Unchanged) => "unchanged",
            Err(err) => err.kind(),
        };
        counter!("ensgw_alias_claims_total", "outcome" => label).increment(1);

        match outcome {
            Ok(_) => Ok(alias.to_string()),
            Err(err) => {
                if err.is_unavailable() {
                    warn!(owner = %encode_address(owner), alias, error = %err, "alias claim failed");
                } else {
                    debug!(owner = %encode_address(owner), alias, error = %err, "alias claim rejected");
                }
                Err(err)
            }
        }
    }

    async fn try_claim(&self, owner: &Address, alias: &str, signature: &str) -> Result<ClaimOutcome> {
        validate_alias(alias)?;

        let signer = ClaimMessage::new(owner, alias).recover_signer(signature)?;
        if signer != *owner {
            return Err(AliasError::BadSignature(format!(
                "signed by {}, not {}",
                encode_address(&signer),
                encode_address(owner)
            )));
        }

        self.check_membership(owner).await?;

        let previous = self.bounded(self.store.get_alias_for_owner(owner)).await?;
        if previous.as_deref() == Some(alias) {
            return Ok(ClaimOutcome::Unchanged);
        }

        if self.bounded(self.store.alias_exists(alias)).await? {
            return Err(AliasError::AliasTaken {
                alias: alias.to_string(),
            });
        }

        self.bounded(self.store.bind_alias(owner, alias, previous.as_deref()))
            .await?;
        info!(
            owner = %encode_address(owner),
            alias,
            previous = previous.as_deref().unwrap_or(""),
            "alias claimed"
        );
        Ok(ClaimOutcome::Bound)
    }

    async fn check_membership(&self, owner: &Address) -> Result<()> {
        let is_member = match timeout(self.io_timeout, self.membership.is_member(owner)).await {
            Ok(Ok(is_member)) => is_member,
            Ok(Err(err)) => return Err(AliasError::MembershipUnavailable(err.to_string())),
            Err(_) => {
                return Err(AliasError::MembershipUnavailable(
                    "membership check timed out".to_string(),
                ))
            }
        };

        if is_member {
            Ok(())
        } else {
            Err(AliasError::NotAuthorized {
                address: encode_address(owner),
            })
        }
    }

    /// Alias currently bound to `owner`, if any.
    pub async fn alias_of(&self, owner: &Address) -> Result<Option<String>> {
        self.bounded(self.store.get_alias_for_owner(owner)).await
    }

    /// Every binding, ordered by alias.
    pub async fn list(&self) -> Result<Vec<AliasEntry>> {
        self.bounded(self.store.list_aliases()).await
    }

    async fn bounded<T>(&self, fut: impl Future<Output = StoreResult<T>>) -> Result<T> {
        match timeout(self.io_timeout, fut).await {
            Ok(result) => result.map_err(AliasError::from),
            Err(_) => Err(AliasError::Store(StoreError::Unavailable(
                "store call timed out".to_string(),
            ))),
        }
    }
}

enum ClaimOutcome {
    Bound,
    Unchanged,
}
