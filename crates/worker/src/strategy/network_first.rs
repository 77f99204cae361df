use tether_core::{Error, RequestKey, ResourceRequest, ResponseSnapshot};

use super::{Dispatcher, Served, ServedFrom, YOU_ARE_OFFLINE};

impl Dispatcher {
    /// Try the network, falling back to the current generation when it fails.
    ///
    /// Successful and opaque responses are copied into the cache in the
    /// background. A navigation with nothing cached gets the offline page; a
    /// sub-resource gets the network error.
    pub(super) async fn network_first(&self, request: ResourceRequest, key: RequestKey) -> Result<Served, Error> {
        let error = match self.network.fetch(&request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_in_background(&key, response.clone());
                }
                return Ok(Served::new(response, ServedFrom::Network));
            }
            Err(e) => e,
        };

        tracing::debug!(url = key.absolute(), "network failed, trying cache: {error}");
        if let Some(cached) = self.lookup(&key).await {
            return Ok(Served::new(cached, ServedFrom::Cache));
        }

        if request.is_navigation() {
            tracing::info!(url = key.absolute(), "serving offline page");
            let page = ResponseSnapshot::synthetic_html(key.absolute(), YOU_ARE_OFFLINE);
            return Ok(Served::new(page, ServedFrom::Offline));
        }

        Err(error)
    }
}
