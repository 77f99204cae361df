//! Generation cleanup at activation.
//!
//! A generation is a named set of cached entries. Exactly one generation is
//! current at a time; every other generation found in the store is removed
//! before the worker starts controlling fetches.

use std::sync::Arc;
use tokio::task::JoinSet;

use tether_core::CacheStore;

/// What activation removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub current: String,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Clone)]
pub struct GenerationManager {
    store: Arc<dyn CacheStore>,
    current: Arc<str>,
}

impl GenerationManager {
    pub fn new(store: Arc<dyn CacheStore>, current: impl Into<Arc<str>>) -> Self {
        Self { store, current: current.into() }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Delete every generation other than the current one.
    ///
    /// Deletions run concurrently and this returns once all have settled.
    /// Failures are logged per generation and never abort the others.
    pub async fn activate_latest(&self) -> ActivationReport {
        let mut report = ActivationReport { current: self.current.to_string(), ..Default::default() };

        if let Err(e) = self.store.open(&self.current).await {
            tracing::warn!(generation = %self.current, "failed to open current generation: {e}");
        }

        let names = match self.store.keys().await {
            Ok(names) => names,
            Err(e) => {
                tracing::error!("failed to list cache generations: {e}");
                return report;
            }
        };

        let mut set = JoinSet::new();
        for name in names.into_iter().filter(|name| *name != *self.current) {
            let store = Arc::clone(&self.store);
            set.spawn(async move {
                let result = store.delete(&name).await;
                (name, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, Ok(_))) => {
                    tracing::info!(generation = %name, "deleted stale cache generation");
                    report.deleted.push(name);
                }
                Ok((name, Err(e))) => {
                    tracing::warn!(generation = %name, "failed to delete cache generation: {e}");
                    report.failed.push(name);
                }
                Err(e) => tracing::warn!("generation cleanup task failed: {e}"),
            }
        }

        report.deleted.sort();
        report.failed.sort();
        report
    }
}
