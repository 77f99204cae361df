//! Core types and shared functionality for tether.
//!
//! This crate provides:
//! - Request/response model shared by the worker and the network client
//! - Generation-scoped cache store with SQLite backend
//! - The `Network` seam consumed by the caching strategies
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod network;

pub use cache::{CacheDb, CacheStore, GenerationInfo};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Method, RequestKey, RequestMode, ResourceRequest, ResponseKind, ResponseSnapshot};
pub use network::Network;
