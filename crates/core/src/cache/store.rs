//! The store interface consumed by the worker.
//!
//! Operations mirror a browser-style cache storage: generations are opened
//! by name, entries are matched and put by store key, and whole generations
//! are listed and deleted.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::generations::GenerationInfo;
use crate::Error;
use crate::http::ResponseSnapshot;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the generation if absent.
    async fn open(&self, generation: &str) -> Result<(), Error>;

    async fn match_entry(&self, generation: &str, cache_key: &str) -> Result<Option<ResponseSnapshot>, Error>;

    /// Store a snapshot, replacing any previous one under the same key.
    async fn put(&self, generation: &str, cache_key: &str, response: &ResponseSnapshot) -> Result<(), Error>;

    /// Store every snapshot atomically.
    async fn put_all(&self, generation: &str, entries: &[(String, ResponseSnapshot)]) -> Result<(), Error>;

    /// Names of all generations present.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a whole generation. Returns false if it did not exist.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    async fn entry_count(&self, generation: &str) -> Result<u64, Error>;

    async fn generations(&self) -> Result<Vec<GenerationInfo>, Error>;
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.open_generation(generation).await
    }

    async fn match_entry(&self, generation: &str, cache_key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        self.get_entry(generation, cache_key).await
    }

    async fn put(&self, generation: &str, cache_key: &str, response: &ResponseSnapshot) -> Result<(), Error> {
        self.put_entry(generation, cache_key, response).await
    }

    async fn put_all(&self, generation: &str, entries: &[(String, ResponseSnapshot)]) -> Result<(), Error> {
        self.put_entries(generation, entries).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.generation_names().await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.delete_generation(generation).await
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        self.count_entries(generation).await
    }

    async fn generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.list_generations().await
    }
}
