//! Core data model.
//!
//! A job is an opaque JSON payload plus the lifecycle bookkeeping the queue
//! needs to hand it to exactly one worker at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Largest accepted payload, measured as serialized JSON.
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A unit of work tracked by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier. Survives replace-on-duplicate.
    pub id: JobId,

    /// Arbitrary parameters for the execution step. Never interpreted here.
    pub payload: serde_json::Value,

    /// Current lifecycle status.
    pub status: JobStatus,

    /// Number of times the job has been claimed in the current round.
    pub attempt_count: u32,

    /// Worker currently (or most recently) holding the job.
    pub worker_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Error message from the execution step, set only on failure.
    pub last_error: Option<String>,
}

/// Newtype for job IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(JobId)
            .map_err(|_| Error::Validation(format!("invalid job id: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker.
    Queued,
    /// Claimed by exactly one worker.
    Processing,
    /// Execution step succeeded. Terminal.
    Completed,
    /// Execution step failed. Terminal; never requeued automatically.
    Failed,
}

impl JobStatus {
    /// Can transition from self to `to`?
    ///
    /// `Queued -> Queued` and `Processing -> Queued` only happen through
    /// replace-on-duplicate.
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, to),
            (Queued, Processing)
                | (Queued, Queued)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Queued)
        )
    }

    /// Is this a terminal status?
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Queued or processing: eligible as a dedup target.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Reject payloads that are not JSON objects or exceed [`MAX_PAYLOAD_BYTES`].
pub fn validate_payload(payload: &serde_json::Value) -> Result<()> {
    if !payload.is_object() {
        return Err(Error::Validation(
            "payload must be a JSON object".to_string(),
        ));
    }

    let size = serde_json::to_vec(payload)
        .map_err(|e| Error::Validation(format!("payload is not serializable: {e}")))?
        .len();
    if size > MAX_PAYLOAD_BYTES {
        return Err(Error::Validation(format!(
            "payload too large ({size} bytes, max {MAX_PAYLOAD_BYTES})"
        )));
    }

    Ok(())
}

/// Rebuild a payload with object keys in sorted order at every depth.
///
/// Two payloads are duplicates exactly when their canonical forms are equal.
pub fn canonicalize(payload: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match payload {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(n) => match n.as_f64() {
            // Integral floats compare equal to integers in JSONB; store them as integers.
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
                Value::from(f as i64)
            }
            _ => payload.clone(),
        },
        other => other.clone(),
    }
}

/// Largest magnitude below which every integral `f64` is exact.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

// ---------------------------------------------------------------------------
// Status report
// ---------------------------------------------------------------------------

/// What a status query returns to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub attempt_count: u32,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl From<Job> for JobStatusReport {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            attempt_count: job.attempt_count,
            payload: job.payload,
            last_error: job.last_error,
        }
    }
}
