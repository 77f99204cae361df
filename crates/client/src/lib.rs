//! Client code for tether.
//!
//! This crate provides the reqwest-backed implementation of the
//! `tether_core::Network` trait used by the worker and the server.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, response_kind};
