//! Install, activate and fetch events.
//!
//! The worker moves through `parsed → installing → installed → activating →
//! activated`. It only claims requests once activation has begun; before that
//! every request passes through to the network untouched.
//!
//! ```text
//! on_install   populate the current generation (failure is logged, never raised)
//! on_activate  delete every other generation, then control fetches
//! on_fetch     decide synchronously whether to respond, then respond asynchronously
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};

use tether_core::{AppConfig, CacheStore, Error, GenerationInfo, Method, Network, ResourceRequest};

use crate::background::Background;
use crate::generation::{ActivationReport, GenerationManager};
use crate::manifest::Manifest;
use crate::precache::PrecacheLoader;
use crate::strategy::{Dispatcher, Served, ServedFrom, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl WorkerState {
    /// Whether requests are intercepted in this state.
    pub fn controls_fetches(&self) -> bool {
        matches!(self, Self::Activating | Self::Activated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub cache_version: String,
    pub manifest: Manifest,
}

impl WorkerConfig {
    /// Parse the manifest against the configured origin.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self {
            cache_version: config.cache_version.clone(),
            manifest: Manifest::parse(&config.manifest, &origin)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Every manifest entry was stored.
    Complete { entries: usize },
    /// Population failed; the worker carries on and serves uncached assets from the network.
    Degraded { reason: String },
}

impl InstallOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// The worker's decision for one request.
#[derive(Debug)]
pub enum FetchEvent {
    /// Not intercepted. The host sends the request to the network itself.
    Passthrough(ResourceRequest),
    Handled(PendingResponse),
}

/// A response being produced in the background.
///
/// Dropping it does not cancel the work or its cache writes.
#[derive(Debug)]
pub struct PendingResponse {
    strategy: Strategy,
    rx: oneshot::Receiver<Result<Served, Error>>,
}

impl PendingResponse {
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub async fn response(self) -> Result<Served, Error> {
        self.rx
            .await
            .map_err(|_| Error::WorkerState("fetch task ended without a response".into()))?
    }
}

#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub current_generation: String,
    pub generations: Vec<GenerationInfo>,
}

pub struct ServiceWorker {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    config: WorkerConfig,
    generations: GenerationManager,
    dispatcher: Dispatcher,
    state: watch::Sender<WorkerState>,
}

impl ServiceWorker {
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn Network>, config: WorkerConfig) -> Self {
        let generation: Arc<str> = Arc::from(config.cache_version.as_str());
        let generations = GenerationManager::new(Arc::clone(&store), Arc::clone(&generation));
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&network),
            generation,
            Arc::new(config.manifest.clone()),
            Background::new(),
        );
        let (state, _) = watch::channel(WorkerState::Parsed);
        Self { store, network, config, generations, dispatcher, state }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn current_generation(&self) -> &str {
        self.generations.current()
    }

    fn transition(&self, next: WorkerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, "worker state changed");
        }
    }

    /// Populate the current generation from the manifest.
    ///
    /// A population failure is logged and reported as degraded, never
    /// returned as an error. Re-running install on an active worker refreshes
    /// the generation without changing state.
    pub async fn on_install(&self) -> InstallOutcome {
        let refreshing = self.state().controls_fetches();
        if !refreshing {
            self.transition(WorkerState::Installing);
        }

        let loader = PrecacheLoader::new(
            Arc::clone(&self.store),
            Arc::clone(&self.network),
            self.generations.current(),
        );
        let outcome = match loader.populate(&self.config.manifest).await {
            Ok(entries) => InstallOutcome::Complete { entries },
            Err(e) => {
                tracing::error!(generation = self.generations.current(), "precache failed: {e}");
                InstallOutcome::Degraded { reason: e.to_string() }
            }
        };

        if !refreshing {
            self.transition(WorkerState::Installed);
        }
        outcome
    }

    /// Run install up to `attempts` times, pausing `delay` between degraded runs.
    pub async fn install_with_retry(&self, attempts: u32, delay: Duration) -> InstallOutcome {
        let attempts = attempts.max(1);
        let mut outcome = self.on_install().await;
        for attempt in 2..=attempts {
            if outcome.is_complete() {
                break;
            }
            tracing::warn!(attempt, attempts, "retrying install after {delay:?}");
            tokio::time::sleep(delay).await;
            outcome = self.on_install().await;
        }
        outcome
    }

    /// Remove superseded generations and start controlling fetches.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkerState` if install has not completed.
    pub async fn on_activate(&self) -> Result<ActivationReport, Error> {
        let state = self.state();
        if matches!(state, WorkerState::Parsed | WorkerState::Installing) {
            return Err(Error::WorkerState(format!("cannot activate while {state}")));
        }

        self.transition(WorkerState::Activating);
        let report = self.generations.activate_latest().await;
        self.transition(WorkerState::Activated);

        tracing::info!(
            generation = %report.current,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "activation complete"
        );
        Ok(report)
    }

    /// Decide whether the worker responds to `request`.
    ///
    /// The decision is made before any asynchronous work. Handled requests
    /// start immediately on the current runtime; one received while activation
    /// is still running waits for it to finish.
    pub fn on_fetch(&self, request: ResourceRequest) -> FetchEvent {
        if !self.state().controls_fetches() {
            return FetchEvent::Passthrough(request);
        }
        if request.method != Method::Get {
            return FetchEvent::Passthrough(request);
        }

        let (key, strategy) = self.dispatcher.classify(&request);
        let (tx, rx) = oneshot::channel();
        let dispatcher = self.dispatcher.clone();
        let mut state = self.state.subscribe();

        self.dispatcher.background().spawn(async move {
            let _ = state.wait_for(|s| *s == WorkerState::Activated).await;
            let _ = tx.send(dispatcher.respond(request, key, strategy).await);
        });

        FetchEvent::Handled(PendingResponse { strategy, rx })
    }

    /// Respond to a request the way a host would: passthrough requests go to
    /// the network, handled ones await the worker's response.
    pub async fn handle_fetch(&self, request: ResourceRequest) -> Result<Served, Error> {
        match self.on_fetch(request) {
            FetchEvent::Passthrough(request) => {
                let response = self.network.fetch(&request).await?;
                Ok(Served::new(response, ServedFrom::Passthrough))
            }
            FetchEvent::Handled(pending) => pending.response().await,
        }
    }

    /// Wait for background revalidations and cache writes to finish.
    pub async fn settle(&self) {
        self.dispatcher.background().settle().await;
    }

    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        Ok(WorkerStatus {
            state: self.state(),
            current_generation: self.generations.current().to_string(),
            generations: self.store.generations().await?,
        })
    }
}
