//! HTTP surface of the gateway: CCIP-Read endpoints, alias endpoints,
//! health and metrics.

pub mod server;

pub use server::{build_router, start_server, AppState};
