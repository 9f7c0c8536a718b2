//! A set of workers sharing one store, one executor and one stop signal.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::executor::Executor;
use super::runner::{Worker, WorkerConfig};
use crate::store::JobStore;

pub struct WorkerPool {
    stop: CancellationToken,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl WorkerPool {
    /// Spawn `count` worker loops on the current runtime.
    pub fn start(
        count: usize,
        store: Arc<dyn JobStore>,
        executor: Arc<dyn Executor>,
        config: WorkerConfig,
    ) -> Self {
        let stop = CancellationToken::new();
        let handles = (0..count)
            .map(|_| {
                let worker = Worker::new(
                    Arc::clone(&store),
                    Arc::clone(&executor),
                    config.clone(),
                    stop.clone(),
                );
                let id = worker.id().to_string();
                let handle = tokio::spawn(async move { worker.run().await });
                (id, handle)
            })
            .collect();

        info!(workers = count, "worker pool started");
        Self { stop, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Token that stops every worker in the pool when cancelled.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Stop all workers and wait for them to finish their current job.
    pub async fn shutdown(self) {
        self.stop.cancel();
        for (id, handle) in self.handles {
            if let Err(e) = handle.await {
                error!(worker_id = %id, error = %e, "worker task ended abnormally");
            }
        }
        info!("worker pool stopped");
    }
}
