//! Request routing between the two caching strategies.
//!
//! Precached assets are answered stale-while-revalidate; everything else is
//! network-first with the current generation as the fallback.

mod network_first;
mod revalidate;

use std::sync::Arc;

use tether_core::{CacheStore, Error, Network, RequestKey, ResourceRequest, ResponseSnapshot};

use crate::background::Background;
use crate::manifest::Manifest;

pub const OFFLINE_CONTENT_UNAVAILABLE: &str =
    "<h1>Offline Content Unavailable</h1><p>The requested content is not available offline.</p>";

pub const YOU_ARE_OFFLINE: &str = "<h1>You are offline!</h1><p>Please check your internet connection.</p>";

/// Where a delivered response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Network,
    Cache,
    /// A synthetic offline page.
    Offline,
    /// Not intercepted; fetched from the network untouched.
    Passthrough,
}

impl ServedFrom {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Offline => "offline",
            Self::Passthrough => "passthrough",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: ServedFrom,
}

impl Served {
    pub fn new(response: ResponseSnapshot, source: ServedFrom) -> Self {
        Self { response, source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    StaleWhileRevalidate,
    NetworkFirst,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaleWhileRevalidate => "stale-while-revalidate",
            Self::NetworkFirst => "network-first",
        }
    }
}

/// Routes intercepted requests against one cache generation.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    generation: Arc<str>,
    manifest: Arc<Manifest>,
    background: Background,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn CacheStore>, network: Arc<dyn Network>, generation: impl Into<Arc<str>>,
        manifest: Arc<Manifest>, background: Background,
    ) -> Self {
        Self { store, network, generation: generation.into(), manifest, background }
    }

    pub fn classify(&self, request: &ResourceRequest) -> (RequestKey, Strategy) {
        let key = RequestKey::of(request);
        let strategy = if self.manifest.is_precached(&key) {
            Strategy::StaleWhileRevalidate
        } else {
            Strategy::NetworkFirst
        };
        (key, strategy)
    }

    pub async fn dispatch(&self, request: ResourceRequest) -> Result<Served, Error> {
        let (key, strategy) = self.classify(&request);
        self.respond(request, key, strategy).await
    }

    /// Run an already classified request through its strategy.
    pub async fn respond(
        &self, request: ResourceRequest, key: RequestKey, strategy: Strategy,
    ) -> Result<Served, Error> {
        tracing::debug!(url = %request.url, strategy = strategy.as_str(), "dispatching request");
        match strategy {
            Strategy::StaleWhileRevalidate => Ok(self.stale_while_revalidate(request, key).await),
            Strategy::NetworkFirst => self.network_first(request, key).await,
        }
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Write a copy to the current generation without delaying the caller.
    fn store_in_background(&self, key: &RequestKey, response: ResponseSnapshot) {
        if !key.is_storable() {
            return;
        }
        let store = Arc::clone(&self.store);
        let generation = Arc::clone(&self.generation);
        let cache_key = key.cache_key().to_string();
        self.background.spawn(async move {
            if let Err(e) = store.put(&generation, &cache_key, &response).await {
                tracing::warn!(url = %response.url, "cache write failed: {e}");
            }
        });
    }

    async fn lookup(&self, key: &RequestKey) -> Option<ResponseSnapshot> {
        if !key.is_storable() {
            return None;
        }
        match self.store.match_entry(&self.generation, key.cache_key()).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = key.absolute(), "cache lookup failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ORIGIN, ScriptedNetwork, memory_store, url};

    pub(super) async fn dispatcher(
        manifest: &[&str], network: Arc<ScriptedNetwork>,
    ) -> (Dispatcher, Arc<tether_core::CacheDb>) {
        let db = memory_store().await;
        let manifest = Manifest::parse(manifest, &url::Url::parse(ORIGIN).unwrap()).unwrap();
        let dispatcher = Dispatcher::new(db.clone(), network, "v1", Arc::new(manifest), Background::new());
        (dispatcher, db)
    }

    #[tokio::test]
    async fn test_classify_routes_by_manifest() {
        let (dispatcher, _) = dispatcher(&["/", "https://cdn.example.com/lib.js"], ScriptedNetwork::new()).await;

        let (_, strategy) = dispatcher.classify(&ResourceRequest::navigate(url("/")));
        assert_eq!(strategy, Strategy::StaleWhileRevalidate);

        let (_, strategy) = dispatcher.classify(&ResourceRequest::get(url("https://cdn.example.com/lib.js")));
        assert_eq!(strategy, Strategy::StaleWhileRevalidate);

        let (_, strategy) = dispatcher.classify(&ResourceRequest::get(url("/api/items")));
        assert_eq!(strategy, Strategy::NetworkFirst);
    }

    #[tokio::test]
    async fn test_dispatch_reports_source() {
        let network = ScriptedNetwork::new();
        network.respond("https://app.example.com/api/items", "[]");
        let (dispatcher, _) = dispatcher(&["/"], network).await;

        let served = dispatcher.dispatch(ResourceRequest::get(url("/api/items"))).await.unwrap();
        assert_eq!(served.source, ServedFrom::Network);
        assert_eq!(served.source.as_str(), "network");
    }
}
