//! Job repository contract.
//!
//! Everything the queue, the workers and status queries need from durable
//! storage. [`crate::db::Db`] implements it over Postgres; [`MemoryStore`]
//! implements it in-process.
//!
//! All coordination between workers goes through this trait. Implementations
//! must guarantee that concurrent [`JobStore::claim_next`] calls never hand
//! the same job to two callers.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Job, JobId};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a `queued` job with zero attempts.
    async fn insert(&self, payload: &serde_json::Value) -> Result<JobId>;

    /// Find a `queued` or `processing` job with a structurally equal payload.
    /// Key order is ignored and numbers compare by value (`1` equals `1.0`).
    /// Any match will do when there are several.
    async fn find_duplicate(&self, payload: &serde_json::Value) -> Result<Option<JobId>>;

    /// Swap in a new payload and restart the job from `queued`: zero attempts,
    /// no worker, fresh `created_at`. The id is preserved.
    async fn replace(&self, id: JobId, payload: &serde_json::Value) -> Result<JobId>;

    /// Point read without locking.
    async fn get(&self, id: JobId) -> Result<Option<Job>>;

    /// Atomically move the oldest unlocked `queued` job to `processing` for
    /// `worker_id`. Returns `None` instead of waiting when nothing is free.
    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>>;

    /// `processing -> completed`, only while `worker_id` still holds the
    /// claim. Returns false (without error) when the job is missing, not in
    /// `processing`, or was replaced and claimed by another worker.
    async fn mark_completed(&self, id: JobId, worker_id: &str) -> Result<bool>;

    /// `processing -> failed`, recording `error`. Same no-op rules as
    /// [`JobStore::mark_completed`].
    async fn mark_failed(&self, id: JobId, worker_id: &str, error: &str) -> Result<bool>;

    /// Verify the store is reachable.
    async fn health_check(&self) -> Result<()>;
}
