//! The network seam consumed by the caching strategies.

use async_trait::async_trait;

use crate::Error;
use crate::http::{ResourceRequest, ResponseSnapshot};

/// Something that can fetch a resource from the live network.
///
/// Any received response, whatever its status, is `Ok`. Errors are reserved
/// for transport failures: unreachable host, DNS failure, timeout, or an
/// oversized body (`Error::is_network` holds for all of them).
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResponseSnapshot, Error>;
}
