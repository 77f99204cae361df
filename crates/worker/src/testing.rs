//! Test doubles for the network and store seams.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;

use tether_core::{CacheDb, CacheStore, Error, GenerationInfo, Network, ResourceRequest, ResponseKind, ResponseSnapshot};

pub(crate) const ORIGIN: &str = "https://app.example.com";

pub(crate) fn url(path_or_url: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path_or_url).unwrap()
}

pub(crate) fn ok(url: &str, body: &'static str) -> ResponseSnapshot {
    ResponseSnapshot {
        url: url.to_string(),
        status: 200,
        status_text: "OK".to_string(),
        kind: ResponseKind::Basic,
        headers: vec![("content-type".to_string(), "text/plain".to_string())],
        body: Bytes::from_static(body.as_bytes()),
    }
}

pub(crate) async fn memory_store() -> Arc<CacheDb> {
    Arc::new(CacheDb::open_in_memory().await.unwrap())
}

#[derive(Clone)]
enum Reply {
    Respond(ResponseSnapshot),
    Fail,
    Hang,
    Gated(Arc<Notify>, ResponseSnapshot),
}

/// Network double answering per URL; unscripted URLs fail like an unreachable host.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn script(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    pub(crate) fn respond(&self, url: &str, body: &'static str) {
        self.script(url, Reply::Respond(ok(url, body)));
    }

    pub(crate) fn respond_with(&self, url: &str, response: ResponseSnapshot) {
        self.script(url, Reply::Respond(response));
    }

    pub(crate) fn fail(&self, url: &str) {
        self.script(url, Reply::Fail);
    }

    pub(crate) fn hang(&self, url: &str) {
        self.script(url, Reply::Hang);
    }

    /// Respond only once the returned gate is opened with `notify_one`.
    pub(crate) fn gate(&self, url: &str, body: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script(url, Reply::Gated(Arc::clone(&gate), ok(url, body)));
        gate
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResponseSnapshot, Error> {
        let url = request.url.as_str().to_string();
        self.calls.lock().unwrap().push(url.clone());
        let reply = self.replies.lock().unwrap().get(&url).cloned().unwrap_or(Reply::Fail);

        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail => Err(Error::FetchFailed(format!("{url}: connection refused"))),
            Reply::Hang => std::future::pending().await,
            Reply::Gated(gate, response) => {
                gate.notified().await;
                Ok(response)
            }
        }
    }
}

/// Store wrapper whose `delete` fails for one generation.
pub(crate) struct StubbornStore {
    pub(crate) inner: Arc<CacheDb>,
    pub(crate) undeletable: String,
}

#[async_trait]
impl CacheStore for StubbornStore {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.inner.open_generation(generation).await
    }

    async fn match_entry(&self, generation: &str, cache_key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        self.inner.get_entry(generation, cache_key).await
    }

    async fn put(&self, generation: &str, cache_key: &str, response: &ResponseSnapshot) -> Result<(), Error> {
        self.inner.put_entry(generation, cache_key, response).await
    }

    async fn put_all(&self, generation: &str, entries: &[(String, ResponseSnapshot)]) -> Result<(), Error> {
        self.inner.put_entries(generation, entries).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.generation_names().await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        if generation == self.undeletable {
            return Err(Error::CorruptEntry(format!("{generation} is locked")));
        }
        self.inner.delete_generation(generation).await
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        self.inner.count_entries(generation).await
    }

    async fn generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.inner.list_generations().await
    }
}
