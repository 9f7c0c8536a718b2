//! Integration tests for telemetry initialization and span helpers.

use jobq::model::{JobId, JobStatus};

#[test]
fn telemetry_initializes_without_endpoint() {
    // The global subscriber can only be set once per process, so a second
    // init in the same binary may return Err; that is acceptable.
    let config = jobq::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "jobq-test".to_string(),
        log_level: "debug".to_string(),
    };
    let _guard = jobq::telemetry::init_telemetry(config);
}

#[test]
fn job_span_creates_and_records_transitions() {
    let span = jobq::telemetry::job::start_job_span("worker-1", JobId::new(), 1);
    jobq::telemetry::job::record_state_transition(&span, JobStatus::Queued, JobStatus::Processing);
    jobq::telemetry::job::record_state_transition(
        &span,
        JobStatus::Processing,
        JobStatus::Completed,
    );
}

#[test]
fn metric_instruments_build_against_noop_provider() {
    use opentelemetry::KeyValue;

    jobq::telemetry::metrics::jobs_submitted().add(1, &[KeyValue::new("result", "created")]);
    jobq::telemetry::metrics::claims().add(1, &[KeyValue::new("result", "empty")]);
    jobq::telemetry::metrics::worker_errors().add(1, &[]);
    jobq::telemetry::metrics::execution_duration_ms()
        .record(12.5, &[KeyValue::new("outcome", "completed")]);
}
