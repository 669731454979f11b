use alloy_primitives::Address;
use async_trait::async_trait;
use ensgw_types::decode_address;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while asking a membership backend.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("membership backend error: {0}")]
    Backend(String),
}

impl From<reqwest::Error> for MembershipError {
    fn from(value: reqwest::Error) -> Self {
        Self::Backend(value.to_string())
    }
}

/// Decides whether an address may claim an alias.
#[async_trait]
pub trait MembershipService: Send + Sync {
    async fn is_member(&self, address: &Address) -> Result<bool, MembershipError>;
}

/// One entry of the builders list.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub id: String,
}

/// Fetches a JSON array of `{"id": "<address>"}` members on every check.
#[derive(Debug, Clone)]
pub struct HttpMembershipService {
    client: reqwest::Client,
    url: String,
}

impl HttpMembershipService {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MembershipError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MembershipError::Backend(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MembershipService for HttpMembershipService {
    async fn is_member(&self, address: &Address) -> Result<bool, MembershipError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(MembershipError::Backend(format!(
                "membership list returned {}",
                response.status()
            )));
        }

        let members: Vec<Member> = response.json().await?;
        debug!(count = members.len(), "fetched membership list");
        Ok(members
            .iter()
            .filter_map(|member| decode_address(&member.id).ok())
            .any(|member| member == *address))
    }
}

/// Fixed allowlist from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticMembershipService {
    members: HashSet<Address>,
}

impl StaticMembershipService {
    pub fn new(members: impl IntoIterator<Item = Address>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl MembershipService for StaticMembershipService {
    async fn is_member(&self, address: &Address) -> Result<bool, MembershipError> {
        Ok(self.members.contains(address))
    }
}

/// Treats every address as a member.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenMembershipService;

#[async_trait]
impl MembershipService for OpenMembershipService {
    async fn is_member(&self, _address: &Address) -> Result<bool, MembershipError> {
        Ok(true)
    }
}

/// Stub implementation backed by an in-memory set.
#[derive(Clone, Default)]
pub struct StubMembershipService {
    members: Arc<RwLock<HashSet<Address>>>,
    unavailable: Arc<AtomicBool>,
}

impl StubMembershipService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(members: impl IntoIterator<Item = Address>) -> Self {
        let stub = Self::new();
        stub.members.write().extend(members);
        stub
    }

    pub fn add(&self, address: Address) {
        self.members.write().insert(address);
    }

    pub fn remove(&self, address: &Address) {
        self.members.write().remove(address);
    }

    /// Make every subsequent check fail as a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl MembershipService for StubMembershipService {
    async fn is_member(&self, address: &Address) -> Result<bool, MembershipError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MembershipError::Backend("stub marked unavailable".into()));
        }
        Ok(self.members.read().contains(address))
    }
}
