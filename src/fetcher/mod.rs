//! Download orchestration
//!
//! [`Fetcher`] turns a download request into a tracked job:
//!
//! 1. create the job record (queued, placeholder metadata)
//! 2. launch yt-dlp writing to a provisional output path
//! 3. feed stdout to the progress parser and stderr to the error collector
//! 4. wait for the process to exit, then join both reader tasks
//! 5. rename the file to its metadata-derived name and mark the job
//!    completed, or record the failure on the job
//!
//! Once a job exists, every failure is recorded on the job record and
//! observed by polling; only request validation errors are returned.

pub mod command;
pub mod parser;
mod readers;

pub use command::FetchTool;
pub use parser::{StreamEvent, StreamLine, parse_line};

use crate::error::{Error, Result};
use crate::registry::JobRegistry;
use crate::storage::BlobStore;
use crate::types::{
    DEFAULT_DURATION_MINUTES, DEFAULT_QUALITY, DownloadAccepted, Event, Job, JobId, JobState,
    PLACEHOLDER, UNTITLED,
};
use crate::utils::{blob_name, output_filename};
use readers::{ErrorOutput, ParserContext, ParseStats};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Upload target for completed downloads
#[derive(Clone)]
pub struct CompletedUpload {
    /// Store receiving the files
    pub store: Arc<dyn BlobStore>,
    /// Blob prefix for the files
    pub prefix: String,
}

/// Download orchestrator (cloneable - all fields are cheap handles)
#[derive(Clone)]
pub struct Fetcher {
    registry: Arc<JobRegistry>,
    tool: Option<Arc<FetchTool>>,
    download_dir: PathBuf,
    event_tx: tokio::sync::broadcast::Sender<Event>,
    completed_upload: Option<CompletedUpload>,
}

impl Fetcher {
    /// Create an orchestrator
    ///
    /// `tool` may be `None` when yt-dlp could not be found; jobs are then
    /// accepted and fail with an explanatory error.
    pub fn new(
        registry: Arc<JobRegistry>,
        tool: Option<FetchTool>,
        download_dir: PathBuf,
        event_tx: tokio::sync::broadcast::Sender<Event>,
    ) -> Self {
        Self {
            registry,
            tool: tool.map(Arc::new),
            download_dir,
            event_tx,
            completed_upload: None,
        }
    }

    /// Upload every completed download to `upload.store`
    pub fn with_completed_upload(mut self, upload: CompletedUpload) -> Self {
        self.completed_upload = Some(upload);
        self
    }

    /// Directory the tool writes into
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// The resolved yt-dlp invocation, if any
    pub fn tool(&self) -> Option<&FetchTool> {
        self.tool.as_deref()
    }

    /// Accept a download and run it in the background
    ///
    /// Returns as soon as the job exists; progress is observed by polling.
    pub async fn start_download(&self, url: Option<&str>) -> Result<JobId> {
        let job = self.create_job(url).await?;
        let id = job.id.clone();

        let fetcher = self.clone();
        tokio::spawn(async move {
            fetcher.run_job(job).await;
        });

        Ok(id)
    }

    /// Accept a download and wait until the job reaches a terminal state
    pub async fn download_blocking(&self, url: Option<&str>) -> Result<DownloadAccepted> {
        let job = self.create_job(url).await?;
        let finished = self.run_job(job).await;

        Ok(DownloadAccepted {
            job_id: finished.id.clone(),
            filename: finished.filename().map(str::to_string),
        })
    }

    async fn create_job(&self, url: Option<&str>) -> Result<Job> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::InvalidRequest("URL is required".into()))?;

        let job = self.registry.create(url).await;
        tracing::info!(job_id = %job.id, url = %url, "Download job queued");
        self.event_tx
            .send(Event::Queued {
                id: job.id.clone(),
                url: url.to_string(),
            })
            .ok();
        Ok(job)
    }

    /// Run the tool for an existing job and finalize its record
    ///
    /// Returns the terminal snapshot of the job.
    pub async fn run_job(&self, job: Job) -> Job {
        let id = job.id.clone();

        let state = match self.execute(&job).await {
            Ok(filename) => JobState::Completed { filename },
            Err(error) => JobState::Failed { error },
        };

        let finished = match self.registry.finish(&id, state).await {
            Ok(finished) => finished,
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Job vanished before finalization");
                return job;
            }
        };

        match &finished.state {
            JobState::Completed { filename } => {
                tracing::info!(job_id = %id, filename = %filename, "Download completed");
                self.event_tx
                    .send(Event::Completed {
                        id,
                        filename: filename.clone(),
                    })
                    .ok();
            }
            JobState::Failed { error } => {
                tracing::warn!(job_id = %id, error = %error, "Download failed");
                self.event_tx
                    .send(Event::Failed {
                        id,
                        error: error.clone(),
                    })
                    .ok();
            }
            JobState::Queued => {}
        }

        finished
    }

    /// Launch the tool and wait for it; `Err` carries the text recorded on the job
    async fn execute(&self, job: &Job) -> std::result::Result<String, String> {
        let tool = self.tool.as_ref().ok_or_else(|| {
            format!(
                "{} executable not found; set tool.binary_path or install it in PATH",
                command::TOOL_BINARY
            )
        })?;

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| {
                format!(
                    "Failed to create download directory '{}': {}",
                    self.download_dir.display(),
                    e
                )
            })?;

        let provisional_path = self.download_dir.join(job.provisional_filename());
        let mut child = tool
            .spawn(&provisional_path, &job.url)
            .map_err(|e| e.to_string())?;

        tracing::debug!(
            job_id = %job.id,
            pid = child.id(),
            output = %provisional_path.display(),
            "Fetch tool started"
        );

        let parser = child.stdout.take().map(|stdout| {
            readers::spawn_stdout_parser(
                stdout,
                ParserContext {
                    job_id: job.id.clone(),
                    registry: self.registry.clone(),
                    event_tx: self.event_tx.clone(),
                },
            )
        });
        let collector = child
            .stderr
            .take()
            .map(|stderr| readers::spawn_stderr_collector(stderr, job.id.clone()));

        let status = child.wait().await;

        // Both readers must drain before the error text is read
        let (_stats, errors): (ParseStats, ErrorOutput) = tokio::join!(
            join_reader(parser, &job.id, "stdout"),
            join_reader(collector, &job.id, "stderr"),
        );

        let status = status.map_err(|e| format!("Failed to wait for fetch tool: {}", e))?;

        if status.success() {
            self.finalize_success(&job.id).await
        } else {
            Err(errors.summary().unwrap_or_else(|| match status.code() {
                Some(code) => format!("Process exited with code {}", code),
                None => "Process terminated by signal".to_string(),
            }))
        }
    }

    /// Rename the output to its final name and record the discovered metadata
    async fn finalize_success(&self, id: &JobId) -> std::result::Result<String, String> {
        let snapshot = self.registry.get(id).await.map_err(|e| e.to_string())?;

        let title = if snapshot.title == PLACEHOLDER {
            UNTITLED
        } else {
            snapshot.title.as_str()
        };
        let final_name = output_filename(
            &snapshot.naming.timestamp,
            title,
            &snapshot.naming.quality_label,
        );
        let provisional_path = self.download_dir.join(snapshot.provisional_filename());
        let final_path = self.download_dir.join(&final_name);

        if final_name != snapshot.provisional_filename()
            && tokio::fs::try_exists(&provisional_path)
                .await
                .unwrap_or(false)
        {
            tokio::fs::rename(&provisional_path, &final_path)
                .await
                .map_err(|e| format!("Error renaming file: {}", e))?;
            tracing::debug!(
                job_id = %id,
                from = %provisional_path.display(),
                to = %final_path.display(),
                "Renamed output file"
            );
        }

        self.registry
            .update(id, |job| {
                if job.quality == PLACEHOLDER {
                    job.quality = DEFAULT_QUALITY.to_string();
                }
                if job.duration_minutes == PLACEHOLDER {
                    job.duration_minutes = DEFAULT_DURATION_MINUTES.to_string();
                }
            })
            .await
            .map_err(|e| e.to_string())?;

        if let Some(upload) = &self.completed_upload {
            let blob = blob_name(&upload.prefix, Path::new(&final_name));
            upload
                .store
                .put_file(&final_path, &blob)
                .await
                .map_err(|e| format!("Error uploading file: {}", e))?;
            tracing::info!(job_id = %id, blob = %blob, store = upload.store.name(), "Uploaded completed download");
        }

        Ok(final_name)
    }
}

async fn join_reader<T: Default>(handle: Option<JoinHandle<T>>, id: &JobId, stream: &str) -> T {
    match handle {
        Some(handle) => handle.await.unwrap_or_else(|e| {
            tracing::error!(job_id = %id, stream = stream, error = %e, "Reader task panicked");
            T::default()
        }),
        None => T::default(),
    }
}
