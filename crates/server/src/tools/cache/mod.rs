//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and refreshing the worker's
//! cache generations.

pub mod refresh;
pub mod status;

pub use refresh::refresh_impl;
pub use status::status_impl;
