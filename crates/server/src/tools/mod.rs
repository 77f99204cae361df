//! MCP tool implementations.
//!
//! This module contains all tools exposed by the tether server.

pub mod cache;
pub mod resource_fetch;

pub use resource_fetch::{ResourceFetchParams, fetch_impl};
