//! # Application State Management
//!
//! State shared by every HTTP worker: the ingestion pipeline itself, plus counters about
//! what it has done since startup.
//!
//! ## Sharing Pattern:
//! - **Coordinator**: `Arc<Coordinator>`, never mutated after startup, so no lock
//! - **Metrics**: `Arc<RwLock<IngestMetrics>>`, every request updates it, the health
//!   endpoint reads a snapshot
//! - **Start time**: `Instant` is `Copy` and never changes

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use crate::error::IngestError;
use crate::pipeline::{Coordinator, StoredRecording};

/// The state handed to every request handler through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline, holding the salt and the storage backend
    pub coordinator: Arc<Coordinator>,

    /// Outcome counters since startup
    pub metrics: Arc<RwLock<IngestMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Counters describing ingestion outcomes.
///
/// ## Why these metrics matter:
/// - **requests**: total callbacks received
/// - **stored**: recordings successfully persisted
/// - **bytes_stored**: volume written to the backend
/// - **failures**: per error kind (`bad_request`, `upstream_fetch`, ...)
#[derive(Debug, Default, Clone)]
pub struct IngestMetrics {
    pub requests: u64,
    pub stored: u64,
    pub bytes_stored: u64,
    pub failures: HashMap<&'static str, u64>,
}

impl IngestMetrics {
    pub fn failure_count(&self) -> u64 {
        self.failures.values().sum()
    }
}

impl AppState {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            metrics: Arc::new(RwLock::new(IngestMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Record the outcome of one ingestion request.
    ///
    /// A poisoned lock only means another worker panicked mid-update; the counters are
    /// still usable, so the guard is recovered rather than propagating the panic.
    pub fn record_outcome(&self, outcome: &Result<StoredRecording, IngestError>) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.requests += 1;
        match outcome {
            Ok(stored) => {
                metrics.stored += 1;
                metrics.bytes_stored += stored.byte_len as u64;
            }
            Err(err) => {
                *metrics.failures.entry(err.kind()).or_default() += 1;
            }
        }
    }

    /// Get a snapshot of current metrics (used for the /health endpoint).
    pub fn get_metrics_snapshot(&self) -> IngestMetrics {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
