//! Alias registry for the ENS gateway.
//!
//! A holder of a private key can bind a human-readable alias to their
//! address by signing a [`ClaimMessage`]. Bound aliases resolve through the
//! gateway as `<alias>.<alias_domain>`. Claims are gated by a
//! [`MembershipService`].

pub mod errors;
pub mod membership;
pub mod registry;
pub mod types;

pub use errors::*;
pub use membership::{
    HttpMembershipService, Member, MembershipError, MembershipService, OpenMembershipService,
    StaticMembershipService, StubMembershipService,
};
pub use registry::{AliasRegistry, DEFAULT_IO_TIMEOUT};
pub use types::*;
