//! Core types for media-relay

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Placeholder shown for metadata that has not been discovered yet
pub const PLACEHOLDER: &str = "Fetching...";

/// Title used when the tool reports an empty or null title
pub const UNTITLED: &str = "Untitled";

/// Quality label used in filenames until a format note is discovered
pub const DEFAULT_QUALITY: &str = "best";

/// Duration recorded on completion when the tool never reported one
pub const DEFAULT_DURATION_MINUTES: &str = "0";

const JOB_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const JOB_ID_LEN: usize = 9;

/// Unique identifier for a job
///
/// Nine characters drawn from `[a-z0-9]`. Opaque to clients.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id: String = (0..JOB_ID_LEN)
            .map(|_| JOB_ID_ALPHABET[rng.gen_range(0..JOB_ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status without the state-specific payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, tool running or about to run
    Queued,
    /// Tool exited successfully and the file is in place
    Completed,
    /// Tool failed, could not be launched, or finalization failed
    Failed,
}

impl JobStatus {
    /// Whether no further transitions can happen
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Queued)
    }
}

/// Job state with the fields that are only valid in that state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobState {
    /// Accepted, tool running or about to run
    Queued,
    /// Finished successfully
    Completed {
        /// Final file name inside the download directory
        filename: String,
    },
    /// Finished with an error
    Failed {
        /// First error text captured, or a generic exit-code message
        error: String,
    },
}

impl JobState {
    /// The status tag of this state
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Queued => JobStatus::Queued,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }
}

/// Output file naming state of a job (not exposed over the API)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputNaming {
    /// Creation timestamp label used as filename prefix (`%H_%M_%S_%d-%m-%Y`)
    pub timestamp: String,
    /// File name handed to the tool as its output path
    pub provisional: String,
    /// File name derived from the most recent metadata
    pub target: String,
    /// Quality label used in file names (`best` until a format note arrives)
    pub quality_label: String,
}

/// One tracked download attempt
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Job {
    /// Job identifier
    pub id: JobId,

    /// Status and state-specific fields (`filename` or `error`)
    #[serde(flatten)]
    pub state: JobState,

    /// Progress percentage (0 to 100)
    pub progress: u8,

    /// Media title, placeholder until discovered
    pub title: String,

    /// Duration in whole minutes, string-encoded
    pub duration_minutes: String,

    /// Quality / format note label
    pub quality: String,

    /// Source URL handed to the tool
    pub url: String,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// When the job reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub(crate) naming: OutputNaming,
}

impl Job {
    /// Create a queued job with placeholder metadata
    pub fn new(id: JobId, url: impl Into<String>) -> Self {
        let created_at = Utc::now();
        let timestamp = crate::utils::timestamp_label(&created_at.with_timezone(&chrono::Local));
        let provisional = crate::utils::output_filename(&timestamp, UNTITLED, DEFAULT_QUALITY);

        Self {
            id,
            state: JobState::Queued,
            progress: 0,
            title: PLACEHOLDER.to_string(),
            duration_minutes: PLACEHOLDER.to_string(),
            quality: PLACEHOLDER.to_string(),
            url: url.into(),
            created_at,
            finished_at: None,
            naming: OutputNaming {
                timestamp,
                target: provisional.clone(),
                provisional,
                quality_label: DEFAULT_QUALITY.to_string(),
            },
        }
    }

    /// Current status tag
    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    /// File name the tool writes to
    pub fn provisional_filename(&self) -> &str {
        &self.naming.provisional
    }

    /// File name derived from the latest discovered metadata
    pub fn target_filename(&self) -> &str {
        &self.naming.target
    }

    /// Final file name, present only when completed
    pub fn filename(&self) -> Option<&str> {
        match &self.state {
            JobState::Completed { filename } => Some(filename),
            _ => None,
        }
    }

    /// Error text, present only when failed
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Response body of `POST /download`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DownloadAccepted {
    /// Identifier to poll with `GET /status/{jobId}`
    #[serde(rename = "jobId")]
    pub job_id: JobId,

    /// Final file name, only when the request waited for completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Overall outcome of a folder upload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Every file was uploaded
    Completed,
    /// Some folders or files failed; see the counters
    CompletedWithErrors,
}

/// Summary returned by a folder upload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadSummary {
    /// Overall outcome
    pub status: UploadStatus,
    /// Local folder that was walked
    #[schema(value_type = String)]
    pub source_folder: PathBuf,
    /// Blob name prefix inside the bucket
    pub destination_prefix: String,
    /// Files uploaded successfully
    pub uploaded_files_count: usize,
    /// Folders that could not be listed
    pub skipped_folders_count: usize,
    /// Permission errors while walking or reading files
    pub permission_error_count: usize,
    /// Files whose transfer failed
    pub upload_error_count: usize,
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted
    Queued {
        /// Job ID
        id: JobId,
        /// Source URL
        url: String,
    },

    /// Progress percentage changed
    Progress {
        /// Job ID
        id: JobId,
        /// Progress percentage (0 to 100)
        percent: u8,
    },

    /// Title, quality or duration discovered
    Metadata {
        /// Job ID
        id: JobId,
        /// Current title
        title: String,
        /// Current quality label
        quality: String,
        /// Current duration in minutes
        duration_minutes: String,
    },

    /// Job completed
    Completed {
        /// Job ID
        id: JobId,
        /// Final file name
        filename: String,
    },

    /// Job failed
    Failed {
        /// Job ID
        id: JobId,
        /// Error message
        error: String,
    },

    /// Service is shutting down
    Shutdown,
}

impl Event {
    /// Name used as the SSE event type
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Queued { .. } => "queued",
            Event::Progress { .. } => "progress",
            Event::Metadata { .. } => "metadata",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Shutdown => "shutdown",
        }
    }
}
