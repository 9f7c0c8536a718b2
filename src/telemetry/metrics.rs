//! Metric instrument factories for jobq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("jobq")
}

/// Counter: jobs submitted.
/// Labels: `result` ("created" | "replaced").
pub fn jobs_submitted() -> Counter<u64> {
    meter()
        .u64_counter("jobq.jobs.submitted")
        .with_description("Number of jobs submitted")
        .build()
}

/// Counter: claim attempts.
/// Labels: `result` ("claimed" | "empty").
pub fn claims() -> Counter<u64> {
    meter()
        .u64_counter("jobq.claims")
        .with_description("Number of claim attempts")
        .build()
}

/// Counter: job status transitions.
/// Labels: `from`, `to`.
pub fn job_transitions() -> Counter<u64> {
    meter()
        .u64_counter("jobq.jobs.transitions")
        .with_description("Number of job status transitions")
        .build()
}

/// Counter: infrastructure errors swallowed by worker loops.
pub fn worker_errors() -> Counter<u64> {
    meter()
        .u64_counter("jobq.worker.errors")
        .with_description("Worker loop iterations that hit a store error")
        .build()
}

/// Histogram: execution step duration in milliseconds.
/// Labels: `outcome` ("completed" | "failed").
pub fn execution_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("jobq.execution.duration_ms")
        .with_description("Execution step duration in milliseconds")
        .with_unit("ms")
        .build()
}
