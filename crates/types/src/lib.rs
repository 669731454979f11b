//! Core types shared by the gateway crates.
//!
//! Names, namehashing and normalization live in [`name`]; the stored record
//! shape served to resolvers lives in [`record`]; alias bindings live in
//! [`alias`].

pub mod address;
pub mod alias;
pub mod name;
pub mod record;

pub use address::*;
pub use alias::*;
pub use name::*;
pub use record::*;

pub use alloy_primitives::{Address, Bytes, B256};
