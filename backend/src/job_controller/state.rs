//! Shared state for long-running background jobs.
//!
//! Certificate batches run outside the request/response cycle: the start
//! endpoint registers a job and returns its id, the client polls the status
//! endpoint, and the worker reports progress through an MPSC channel into the
//! central updater task started here. The jobs map is the single source of
//! truth for every job's `JobStatus`.

use common::jobs::JobStatus;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// Thread-safe container for all job statuses, injected into the Actix
/// application as `web::Data` in `main.rs`.
#[derive(Clone)]
pub struct JobsState {
    /// Job id -> current status. Read concurrently by the status endpoint,
    /// written exclusively by the updater task.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,
    /// Sender side of the channel workers use to report progress without
    /// taking the write lock themselves.
    pub tx: mpsc::Sender<JobUpdate>,
}

/// One status change for one job.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobUpdate {
    pub fn new(job_id: String, status: JobStatus) -> Self {
        JobUpdate { job_id, status }
    }
}

/// Long-running task that applies incoming `JobUpdate`s to the jobs map.
/// Spawned once at startup.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id.clone(), update.status);
    }
}
