//! In-process job store.
//!
//! One mutex guards the whole table, so claims are serialized and trivially
//! disjoint. Useful for tests and for embedding the queue without Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::JobStore;
use crate::error::{Error, Result};
use crate::model::{Job, JobId, JobStatus, canonicalize};

#[derive(Default)]
struct Table {
    rows: HashMap<JobId, Row>,
    /// Insertion counter; breaks `created_at` ties so claims stay FIFO.
    next_seq: u64,
}

struct Row {
    job: Job,
    seq: u64,
}

impl Row {
    fn held_by(&self, worker_id: &str) -> bool {
        self.job.status == JobStatus::Processing
            && self.job.worker_id.as_deref() == Some(worker_id)
    }
}

impl Table {
    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// Job store backed by a `HashMap` behind a single async mutex.
#[derive(Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows held, in any status.
    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert(&self, payload: &serde_json::Value) -> Result<JobId> {
        let mut table = self.table.lock().await;
        let id = JobId::new();
        let seq = table.bump_seq();
        let job = Job {
            id,
            payload: canonicalize(payload),
            status: JobStatus::Queued,
            attempt_count: 0,
            worker_id: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            last_error: None,
        };
        table.rows.insert(id, Row { job, seq });
        Ok(id)
    }

    async fn find_duplicate(&self, payload: &serde_json::Value) -> Result<Option<JobId>> {
        let wanted = canonicalize(payload);
        let table = self.table.lock().await;
        Ok(table
            .rows
            .values()
            .find(|row| row.job.status.is_active() && row.job.payload == wanted)
            .map(|row| row.job.id))
    }

    async fn replace(&self, id: JobId, payload: &serde_json::Value) -> Result<JobId> {
        let mut table = self.table.lock().await;
        let seq = table.bump_seq();
        let row = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("job {id}")))?;

        row.seq = seq;
        row.job.payload = canonicalize(payload);
        row.job.status = JobStatus::Queued;
        row.job.attempt_count = 0;
        row.job.worker_id = None;
        row.job.created_at = Utc::now();
        row.job.started_at = None;
        row.job.completed_at = None;
        row.job.last_error = None;
        Ok(id)
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        let table = self.table.lock().await;
        Ok(table.rows.get(&id).map(|row| row.job.clone()))
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>> {
        let mut table = self.table.lock().await;
        let Some(row) = table
            .rows
            .values_mut()
            .filter(|row| row.job.status == JobStatus::Queued)
            .min_by_key(|row| (row.job.created_at, row.seq))
        else {
            return Ok(None);
        };

        row.job.status = JobStatus::Processing;
        row.job.worker_id = Some(worker_id.to_string());
        row.job.started_at = Some(Utc::now());
        row.job.attempt_count += 1;
        Ok(Some(row.job.clone()))
    }

    async fn mark_completed(&self, id: JobId, worker_id: &str) -> Result<bool> {
        let mut table = self.table.lock().await;
        match table.rows.get_mut(&id) {
            Some(row) if row.held_by(worker_id) => {
                row.job.status = JobStatus::Completed;
                row.job.completed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, id: JobId, worker_id: &str, error: &str) -> Result<bool> {
        let mut table = self.table.lock().await;
        match table.rows.get_mut(&id) {
            Some(row) if row.held_by(worker_id) => {
                row.job.status = JobStatus::Failed;
                row.job.last_error = Some(error.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
