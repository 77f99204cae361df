//! Install-time population of the current generation.

use std::sync::Arc;
use tokio::task::JoinSet;

use tether_core::{CacheStore, Error, Network, RequestKey};

use crate::manifest::Manifest;

pub struct PrecacheLoader {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    generation: Arc<str>,
}

impl PrecacheLoader {
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn Network>, generation: impl Into<Arc<str>>) -> Self {
        Self { store, network, generation: generation.into() }
    }

    /// Fetch every manifest entry and store them all, or store nothing.
    ///
    /// Entries are fetched concurrently. The first transport failure or
    /// non-2xx status aborts the outstanding fetches and fails with
    /// [`Error::PopulationFailed`] naming the URL. Returns the number of
    /// entries written.
    pub async fn populate(&self, manifest: &Manifest) -> Result<usize, Error> {
        self.store.open(&self.generation).await?;

        let requests = manifest.requests();
        let total = requests.len();
        tracing::info!(generation = %self.generation, entries = total, "precaching manifest");

        let mut set = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let network = Arc::clone(&self.network);
            set.spawn(async move {
                let result = network.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut fetched = Vec::with_capacity(total);
        while let Some(joined) = set.join_next().await {
            let (index, request, result) =
                joined.map_err(|e| Error::PopulationFailed(format!("precache task failed: {e}")))?;
            let url = request.url.as_str();
            match result {
                Ok(response) if response.is_ok() => {
                    fetched.push((index, RequestKey::of(&request).cache_key().to_string(), response));
                }
                Ok(response) => {
                    return Err(Error::PopulationFailed(format!("{url}: HTTP {}", response.status)));
                }
                Err(e) => return Err(Error::PopulationFailed(format!("{url}: {e}"))),
            }
        }

        fetched.sort_by_key(|(index, ..)| *index);
        let entries: Vec<(String, _)> = fetched.into_iter().map(|(_, key, response)| (key, response)).collect();
        self.store.put_all(&self.generation, &entries).await?;

        tracing::info!(generation = %self.generation, entries = entries.len(), "precache complete");
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ORIGIN, ScriptedNetwork, memory_store, url};
    use tether_core::{ResourceRequest, ResponseKind, ResponseSnapshot};

    fn manifest(entries: &[&str]) -> Manifest {
        Manifest::parse(entries, &url::Url::parse(ORIGIN).unwrap()).unwrap()
    }

    fn key(u: &str) -> String {
        RequestKey::of(&ResourceRequest::get(url(u))).cache_key().to_string()
    }

    #[tokio::test]
    async fn test_every_entry_retrievable_after_populate() {
        let db = memory_store().await;
        let network = ScriptedNetwork::new();
        network.respond("https://app.example.com/", "root");
        network.respond("https://app.example.com/index.html", "index");
        network.respond("https://cdn.example.com/lib.js", "lib");

        let loader = PrecacheLoader::new(db.clone(), network, "v1");
        let written = loader
            .populate(&manifest(&["/", "/index.html", "https://cdn.example.com/lib.js"]))
            .await
            .unwrap();

        assert_eq!(written, 3);
        for (u, body) in [("/", "root"), ("/index.html", "index"), ("https://cdn.example.com/lib.js", "lib")] {
            let entry = db.get_entry("v1", &key(u)).await.unwrap().unwrap();
            assert_eq!(entry.body, body.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_one_failure_writes_nothing() {
        let db = memory_store().await;
        let network = ScriptedNetwork::new();
        network.respond("https://app.example.com/", "root");
        network.fail("https://app.example.com/manifest.json");

        let loader = PrecacheLoader::new(db.clone(), network, "v1");
        let err = loader.populate(&manifest(&["/", "/manifest.json"])).await.unwrap_err();

        assert!(matches!(err, Error::PopulationFailed(_)));
        assert!(err.to_string().contains("https://app.example.com/manifest.json"));
        assert_eq!(db.count_entries("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_success_status_fails_population() {
        let db = memory_store().await;
        let network = ScriptedNetwork::new();
        network.respond("https://app.example.com/", "root");
        network.respond_with(
            "https://app.example.com/missing.css",
            ResponseSnapshot {
                status: 404,
                status_text: "Not Found".into(),
                kind: ResponseKind::Basic,
                ..crate::testing::ok("https://app.example.com/missing.css", "")
            },
        );

        let loader = PrecacheLoader::new(db.clone(), network, "v1");
        let err = loader.populate(&manifest(&["/", "/missing.css"])).await.unwrap_err();

        assert!(err.to_string().contains("HTTP 404"));
        assert_eq!(db.count_entries("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_wait_for_hanging_fetch() {
        let db = memory_store().await;
        let network = ScriptedNetwork::new();
        network.hang("https://app.example.com/");
        network.fail("https://app.example.com/index.html");

        let loader = PrecacheLoader::new(db.clone(), network, "v1");
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            loader.populate(&manifest(&["/", "/index.html"])),
        )
        .await
        .expect("populate should not wait for the hanging fetch");

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_manifest_opens_generation() {
        let db = memory_store().await;
        let loader = PrecacheLoader::new(db.clone(), ScriptedNetwork::new(), "v1");
        assert_eq!(loader.populate(&Manifest::default()).await.unwrap(), 0);
        assert_eq!(db.generation_names().await.unwrap(), vec!["v1"]);
    }
}
