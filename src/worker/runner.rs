//! Worker loop: claim, execute, finalize, repeat until stopped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use super::executor::Executor;
use crate::error::Result;
use crate::model::{JobId, JobStatus};
use crate::store::JobStore;
use crate::telemetry::job::{record_state_transition, start_job_span};
use crate::telemetry::metrics;

/// Pauses between loop iterations.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep after a claim that found nothing.
    pub idle_interval: Duration,
    /// Sleep after a store error.
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Nothing was queued.
    Idle,
    /// Claimed a job and the execution step succeeded.
    Completed(JobId),
    /// Claimed a job and the execution step failed.
    Failed(JobId),
    /// Claimed a job, but it was replaced while executing; the result was
    /// dropped and the job belongs to its new round.
    Superseded(JobId),
}

/// One worker. Shares nothing with other workers except the store handle.
pub struct Worker {
    id: String,
    store: Arc<dyn JobStore>,
    executor: Arc<dyn Executor>,
    config: WorkerConfig,
    stop: CancellationToken,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<dyn Executor>,
        config: WorkerConfig,
        stop: CancellationToken,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            store,
            executor,
            config,
            stop,
        }
    }

    /// Override the generated worker id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ask the loop to exit. The current job, if any, is still finalized.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Run until stopped. Errors never end the loop; they trigger the
    /// error backoff.
    pub async fn run(&self) {
        info!(worker_id = %self.id, "worker started");

        while !self.stop.is_cancelled() {
            match self.run_once().await {
                Ok(Tick::Idle) => self.pause(self.config.idle_interval).await,
                Ok(tick) => debug!(worker_id = %self.id, ?tick, "iteration done"),
                Err(e) => {
                    error!(worker_id = %self.id, error = %e, "worker iteration failed, backing off");
                    metrics::worker_errors().add(1, &[]);
                    self.pause(self.config.error_backoff).await;
                }
            }
        }

        info!(worker_id = %self.id, "worker stopped");
    }

    /// Claim at most one job and carry it through execution and finalization.
    pub async fn run_once(&self) -> Result<Tick> {
        let Some(job) = self.store.claim_next(&self.id).await? else {
            metrics::claims().add(1, &[KeyValue::new("result", "empty")]);
            return Ok(Tick::Idle);
        };
        metrics::claims().add(1, &[KeyValue::new("result", "claimed")]);

        let span = start_job_span(&self.id, job.id, job.attempt_count);
        record_state_transition(&span, JobStatus::Queued, JobStatus::Processing);
        record_transition(JobStatus::Queued, JobStatus::Processing);

        async {
            info!("job claimed");
            let started = Instant::now();
            let outcome = self.executor.execute(&job.payload).await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            let (to, finalized) = match outcome {
                Ok(()) => (
                    JobStatus::Completed,
                    self.store.mark_completed(job.id, &self.id).await?,
                ),
                Err(e) => {
                    warn!(error = %e, "execution step failed");
                    (
                        JobStatus::Failed,
                        self.store.mark_failed(job.id, &self.id, e.message()).await?,
                    )
                }
            };

            if !finalized {
                warn!(target_status = %to, "claim lost during execution, result dropped");
                return Ok(Tick::Superseded(job.id));
            }

            record_state_transition(&span, JobStatus::Processing, to);
            record_transition(JobStatus::Processing, to);
            metrics::execution_duration_ms()
                .record(elapsed_ms, &[KeyValue::new("outcome", to.as_str())]);

            Ok(match to {
                JobStatus::Completed => Tick::Completed(job.id),
                _ => Tick::Failed(job.id),
            })
        }
        .instrument(span.clone())
        .await
    }

    /// Sleep for `duration`, waking early if stopped.
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = self.stop.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}

fn record_transition(from: JobStatus, to: JobStatus) {
    metrics::job_transitions().add(
        1,
        &[
            KeyValue::new("from", from.as_str()),
            KeyValue::new("to", to.as_str()),
        ],
    );
}
