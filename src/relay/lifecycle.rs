//! Background job eviction and shutdown coordination.

use crate::error::Result;
use crate::types::Event;

use super::MediaRelay;

impl MediaRelay {
    /// Start the sweeper that evicts finished jobs older than `jobs.ttl`
    ///
    /// Returns an already-finished task when no TTL is configured. The
    /// sweeper stops when [`MediaRelay::shutdown`] is called.
    pub fn start_job_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let Some(ttl) = self.config.jobs.ttl else {
            tracing::info!("No job TTL configured, skipping job sweeper");
            return tokio::spawn(async {});
        };

        let ttl = match chrono::Duration::from_std(ttl) {
            Ok(ttl) => ttl,
            Err(e) => {
                tracing::error!(error = %e, "Job TTL out of range, skipping job sweeper");
                return tokio::spawn(async {});
            }
        };

        let registry = self.registry.clone();
        let cancel_token = self.shutdown_token.clone();
        let mut interval = tokio::time::interval(self.config.jobs.sweep_interval);

        tracing::info!(
            ttl_secs = ttl.num_seconds(),
            interval_secs = self.config.jobs.sweep_interval.as_secs(),
            "Job sweeper started"
        );

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(cutoff) = chrono::Utc::now().checked_sub_signed(ttl) else {
                            continue;
                        };
                        let evicted = registry.evict_finished_before(cutoff).await;
                        if evicted > 0 {
                            tracing::debug!(evicted, "Evicted finished jobs");
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        tracing::debug!("Job sweeper stopped");
                        break;
                    }
                }
            }
        })
    }

    /// Begin a graceful shutdown
    ///
    /// Stops accepting downloads, stops the job sweeper and lets the API
    /// server drain its connections. Running downloads are not interrupted.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Ok(());
        }

        tracing::info!("Initiating graceful shutdown");
        self.shutdown_token.cancel();

        let active = self
            .registry
            .list()
            .await
            .iter()
            .filter(|job| !job.status().is_terminal())
            .count();
        if active > 0 {
            tracing::info!(active, "Leaving running downloads to finish in the background");
        }

        self.event_tx.send(Event::Shutdown).ok();
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::super::test_helpers::create_test_relay;
    use super::*;
    use crate::types::JobState;
    use std::time::Duration;

    #[tokio::test]
    async fn sweeper_without_ttl_finishes_immediately() {
        let (relay, _dir) = create_test_relay();
        let handle = relay.start_job_sweeper();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn sweeper_evicts_finished_jobs_and_stops_on_shutdown() {
        let (relay, _dir) = create_test_relay();
        let mut config = (*relay.config).clone();
        config.jobs.ttl = Some(Duration::ZERO);
        config.jobs.sweep_interval = Duration::from_millis(20);
        let relay = crate::MediaRelay::with_components(config, None, None);

        let done = relay.registry.create("https://example.com/done").await;
        relay
            .registry
            .finish(
                &done.id,
                JobState::Failed {
                    error: "x".into(),
                },
            )
            .await
            .unwrap();
        let queued = relay.registry.create("https://example.com/queued").await;

        let handle = relay.start_job_sweeper();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while relay.registry.get(&done.id).await.is_ok() {
            assert!(tokio::time::Instant::now() < deadline, "job never evicted");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(relay.registry.get(&queued.id).await.is_ok());

        relay.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_emits_event_once() {
        let (relay, _dir) = create_test_relay();
        let mut events = relay.subscribe();

        relay.shutdown().await.unwrap();
        relay.shutdown().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), Event::Shutdown);
        assert!(events.try_recv().is_err());
        assert!(relay.is_shutting_down());
    }
}
