//! Reader tasks attached to the tool's stdout and stderr.
//!
//! Both run as tracked tokio tasks; the orchestrator joins them after the
//! process exits and before it reads the collected error text.

use super::parser::{self, StreamEvent, StreamLine};
use crate::registry::JobRegistry;
use crate::types::{Event, JobId};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

/// Counters reported by the stdout parser when the stream ends
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParseStats {
    pub lines: usize,
    pub applied: usize,
    pub unrecognized: usize,
    pub malformed: usize,
}

/// Text accumulated from the tool's diagnostic stream
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ErrorOutput {
    text: String,
}

impl ErrorOutput {
    pub(crate) fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// First `ERROR` line if the tool printed one, otherwise the whole trimmed text
    pub(crate) fn summary(&self) -> Option<String> {
        if let Some(line) = self.text.lines().find(|l| l.contains("ERROR")) {
            return Some(line.trim().to_string());
        }
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Shared handles the stdout parser needs to update a job
#[derive(Clone)]
pub(crate) struct ParserContext {
    pub job_id: JobId,
    pub registry: Arc<JobRegistry>,
    pub event_tx: tokio::sync::broadcast::Sender<Event>,
}

/// Spawn the task that applies progress-stream lines to the job record
pub(crate) fn spawn_stdout_parser<R>(stdout: R, ctx: ParserContext) -> JoinHandle<ParseStats>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut stats = ParseStats::default();
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(job_id = %ctx.job_id, error = %e, "Error reading tool stdout");
                    break;
                }
            }
            stats.lines += 1;

            let line = String::from_utf8_lossy(&buf);
            match parser::parse_line(&line) {
                StreamLine::Events(events) => {
                    stats.applied += 1;
                    apply_events(&ctx, &events).await;
                }
                StreamLine::Unrecognized => stats.unrecognized += 1,
                StreamLine::Malformed(reason) => {
                    stats.malformed += 1;
                    tracing::debug!(
                        job_id = %ctx.job_id,
                        reason = %reason,
                        line = %line.trim(),
                        "Skipping malformed progress line"
                    );
                }
            }
        }

        tracing::debug!(
            job_id = %ctx.job_id,
            lines = stats.lines,
            applied = stats.applied,
            unrecognized = stats.unrecognized,
            malformed = stats.malformed,
            "Tool stdout closed"
        );
        stats
    })
}

async fn apply_events(ctx: &ParserContext, events: &[StreamEvent]) {
    let result = ctx
        .registry
        .update(&ctx.job_id, |job| {
            let before = job.progress;
            let mut metadata_changed = false;
            for event in events {
                if parser::apply(job, event) && !event.is_progress() {
                    metadata_changed = true;
                }
            }

            let progress = (job.progress != before).then_some(job.progress);
            let metadata = metadata_changed.then(|| Event::Metadata {
                id: job.id.clone(),
                title: job.title.clone(),
                quality: job.quality.clone(),
                duration_minutes: job.duration_minutes.clone(),
            });
            (progress, metadata)
        })
        .await;

    match result {
        Ok((progress, metadata)) => {
            if let Some(percent) = progress {
                ctx.event_tx
                    .send(Event::Progress {
                        id: ctx.job_id.clone(),
                        percent,
                    })
                    .ok();
            }
            if let Some(event) = metadata {
                ctx.event_tx.send(event).ok();
            }
        }
        Err(e) => {
            tracing::warn!(job_id = %ctx.job_id, error = %e, "Dropping progress update");
        }
    }
}

/// Spawn the task that accumulates the tool's diagnostic stream
pub(crate) fn spawn_stderr_collector<R>(stderr: R, job_id: JobId) -> JoinHandle<ErrorOutput>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut output = ErrorOutput::default();
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end();
                    tracing::debug!(job_id = %job_id, "stderr: {}", line);
                    output.push_line(line);
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Error reading tool stderr");
                    break;
                }
            }
        }

        output
    })
}
