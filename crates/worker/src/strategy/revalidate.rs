use std::sync::Arc;
use tokio::sync::oneshot;

use tether_core::{RequestKey, ResourceRequest, ResponseSnapshot};

use super::{Dispatcher, OFFLINE_CONTENT_UNAVAILABLE, Served, ServedFrom};

impl Dispatcher {
    /// Serve a precached asset from the current generation and refresh it from
    /// the network in the background.
    ///
    /// A stored entry is returned without waiting on the network. The refresh
    /// only writes once the lookup has completed, so the delivered response is
    /// always the entry that existed before it. Never fails: a miss with a
    /// failed fetch yields the offline content page.
    pub(super) async fn stale_while_revalidate(&self, request: ResourceRequest, key: RequestKey) -> Served {
        let (looked_up_tx, looked_up_rx) = oneshot::channel::<()>();
        let (fresh_tx, fresh_rx) = oneshot::channel();

        let store = Arc::clone(&self.store);
        let network = Arc::clone(&self.network);
        let generation = Arc::clone(&self.generation);
        let cache_key = key.cache_key().to_string();
        let storable = key.is_storable();
        let url = request.url.to_string();
        self.background.spawn(async move {
            let result = network.fetch(&request).await;
            let fresh = match &result {
                Ok(response) if storable && response.is_cacheable() => Some(response.clone()),
                _ => None,
            };
            let _ = fresh_tx.send(result);

            let Some(response) = fresh else { return };
            let _ = looked_up_rx.await;
            match store.put(&generation, &cache_key, &response).await {
                Ok(()) => tracing::debug!(url = %url, "revalidated cache entry"),
                Err(e) => tracing::warn!(url = %url, "cache write failed: {e}"),
            }
        });

        let cached = self.lookup(&key).await;
        let _ = looked_up_tx.send(());

        if let Some(response) = cached {
            return Served::new(response, ServedFrom::Cache);
        }

        match fresh_rx.await {
            Ok(Ok(response)) => Served::new(response, ServedFrom::Network),
            Ok(Err(e)) => {
                tracing::warn!(url = key.absolute(), "precached asset unavailable: {e}");
                offline_content(&key)
            }
            Err(_) => {
                tracing::warn!(url = key.absolute(), "revalidation task ended without a result");
                offline_content(&key)
            }
        }
    }
}

fn offline_content(key: &RequestKey) -> Served {
    let page = ResponseSnapshot::synthetic_html(key.absolute(), OFFLINE_CONTENT_UNAVAILABLE);
    Served::new(page, ServedFrom::Offline)
}
