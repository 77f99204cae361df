//! Offline-first request interception for tether.
//!
//! This crate decides, for every intercepted resource request, whether to
//! answer from the current cache generation, the network, or a synthetic
//! offline page:
//!
//! - [`Manifest`] classifies requests as precached assets
//! - [`PrecacheLoader`] fills the current generation at install time
//! - [`GenerationManager`] removes superseded generations at activation
//! - [`Dispatcher`] routes requests to stale-while-revalidate or network-first
//! - [`ServiceWorker`] ties them together behind install/activate/fetch events

pub mod background;
pub mod generation;
pub mod lifecycle;
pub mod manifest;
pub mod precache;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use background::Background;
pub use generation::{ActivationReport, GenerationManager};
pub use lifecycle::{
    FetchEvent, InstallOutcome, PendingResponse, ServiceWorker, WorkerConfig, WorkerState, WorkerStatus,
};
pub use manifest::{Manifest, ManifestEntry};
pub use precache::PrecacheLoader;
pub use strategy::{Dispatcher, Served, ServedFrom, Strategy};
