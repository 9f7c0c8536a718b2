//! Client-facing queue operations: submit with dedup, status, health.
//!
//! A resubmission of a payload that is still queued or in flight collapses
//! into the existing job and restarts it, instead of running twice.

use std::sync::Arc;

use opentelemetry::KeyValue;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{JobId, JobStatusReport, canonicalize, validate_payload};
use crate::store::JobStore;
use crate::telemetry::metrics;

/// Result of submitting a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitResult {
    /// No unfinished duplicate existed; a new job was queued.
    Created(JobId),
    /// An unfinished duplicate was restarted with the new payload.
    Replaced(JobId),
}

impl SubmitResult {
    /// The id the client should poll, whichever way the submit went.
    pub fn id(self) -> JobId {
        match self {
            SubmitResult::Created(id) | SubmitResult::Replaced(id) => id,
        }
    }
}

/// Whether the backing store is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Healthy,
    Unavailable,
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Health::Healthy => f.write_str("healthy"),
            Health::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Submission and status API over a job store.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
}

impl JobQueue {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Submit a payload. Replaces an unfinished job with a structurally equal
    /// payload, otherwise inserts a new one.
    pub async fn submit(&self, payload: serde_json::Value) -> Result<SubmitResult> {
        validate_payload(&payload)?;
        let payload = canonicalize(&payload);

        let result = match self.store.find_duplicate(&payload).await? {
            Some(existing) => {
                let id = self.store.replace(existing, &payload).await?;
                info!(job_id = %id, "duplicate submission, job restarted");
                SubmitResult::Replaced(id)
            }
            None => {
                let id = self.store.insert(&payload).await?;
                info!(job_id = %id, "job queued");
                SubmitResult::Created(id)
            }
        };

        let label = match result {
            SubmitResult::Created(_) => "created",
            SubmitResult::Replaced(_) => "replaced",
        };
        metrics::jobs_submitted().add(1, &[KeyValue::new("result", label)]);

        Ok(result)
    }

    /// Current status of a job, or [`Error::NotFound`].
    pub async fn status(&self, id: JobId) -> Result<JobStatusReport> {
        self.store
            .get(id)
            .await?
            .map(JobStatusReport::from)
            .ok_or_else(|| Error::NotFound(format!("job {id}")))
    }

    /// Check that the store is reachable.
    pub async fn health_check(&self) -> Health {
        match self.store.health_check().await {
            Ok(()) => Health::Healthy,
            Err(e) => {
                warn!(error = %e, "health check failed");
                Health::Unavailable
            }
        }
    }
}
