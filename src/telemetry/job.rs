//! Job execution span helpers.

use tracing::Span;

use crate::model::{JobId, JobStatus};

/// Start a span covering one claimed job, from execution to finalization.
///
/// `job.status` is declared empty and updated by [`record_state_transition`].
pub fn start_job_span(worker_id: &str, job_id: JobId, attempt: u32) -> Span {
    tracing::info_span!(
        "job.execute",
        "worker.id" = worker_id,
        "job.id" = %job_id,
        "job.attempt" = attempt,
        "job.status" = tracing::field::Empty,
    )
}

/// Record a status transition on the given span and emit an event in it.
pub fn record_state_transition(span: &Span, from: JobStatus, to: JobStatus) {
    span.record("job.status", to.as_str());
    span.in_scope(|| {
        tracing::info!(from = from.as_str(), to = to.as_str(), "state_transition");
    });
}
