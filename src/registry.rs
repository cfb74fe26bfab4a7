//! In-memory job registry
//!
//! The registry exclusively owns every [`Job`] record. Other components read
//! snapshots and mutate records by id through [`JobRegistry::update`], which
//! runs a synchronous closure under the write lock so concurrent writers
//! (the stdout parser and the orchestrator) never race on one record.
//!
//! Nothing is persisted; records live until process exit unless evicted with
//! [`JobRegistry::evict_finished_before`].

use crate::error::{Error, Result};
use crate::types::{Job, JobId, JobState};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory map of job id to job record
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh queued job for `url` and return its snapshot
    pub async fn create(&self, url: &str) -> Job {
        let mut jobs = self.jobs.write().await;

        let mut id = JobId::generate();
        while jobs.contains_key(&id) {
            id = JobId::generate();
        }

        let job = Job::new(id.clone(), url);
        jobs.insert(id, job.clone());
        job
    }

    /// Snapshot of the job with this id
    pub async fn get(&self, id: &JobId) -> Result<Job> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::JobNotFound(id.clone()))
    }

    /// Apply `mutator` to the job with this id under the write lock
    pub async fn update<R>(&self, id: &JobId, mutator: impl FnOnce(&mut Job) -> R) -> Result<R> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| Error::JobNotFound(id.clone()))?;
        Ok(mutator(job))
    }

    /// Move a queued job to a terminal state
    ///
    /// Terminal states are final: finishing an already finished job leaves it
    /// unchanged and returns its current snapshot.
    pub async fn finish(&self, id: &JobId, state: JobState) -> Result<Job> {
        self.update(id, |job| {
            if job.status().is_terminal() {
                tracing::warn!(job_id = %id, "Ignoring transition of a finished job");
            } else {
                job.state = state;
                job.finished_at = Some(Utc::now());
            }
            job.clone()
        })
        .await
    }

    /// Snapshots of every job, oldest first
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Number of tracked jobs
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether no jobs are tracked
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Drop terminal jobs that finished before `cutoff`
    ///
    /// Queued jobs are never evicted. Returns the number of removed jobs.
    pub async fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !matches!(job.finished_at, Some(finished) if finished < cutoff));
        before - jobs.len()
    }
}
