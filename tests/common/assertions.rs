//! Waiting helpers for job state

use media_relay::{Job, JobId, MediaRelay};
use std::time::Duration;

/// Poll a job until it reaches a terminal state
///
/// Panics when the job disappears or `timeout` passes first.
pub async fn wait_for_terminal(relay: &MediaRelay, id: &JobId, timeout: Duration) -> Job {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let job = relay.job_status(id).await.expect("job should exist");
        if job.status().is_terminal() {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} did not finish within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
