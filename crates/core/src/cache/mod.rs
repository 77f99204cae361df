//! SQLite-backed, generation-scoped response cache.
//!
//! This module provides a persistent cache using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Named generations deleted wholesale on upgrade
//! - Request identity hashed with SHA-256
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use generations::GenerationInfo;
pub use store::CacheStore;
