//! Configuration types for media-relay

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Download behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Directory the tool writes into (default: "./downloads")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,

    /// Hold `POST /download` open until the job is terminal (default: false)
    ///
    /// When false the request returns as soon as the job is accepted and all
    /// progress is observed by polling `GET /status/{jobId}`.
    #[serde(default)]
    pub wait_for_completion: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            wait_for_completion: false,
        }
    }
}

/// External fetch tool (yt-dlp) settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub binary_path: Option<PathBuf>,

    /// Whether to search PATH for the binary if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Cookies file passed with `--cookies` when it exists (default: "cookies.txt")
    #[serde(default = "default_cookies_file")]
    #[schema(value_type = Option<String>)]
    pub cookies_file: Option<PathBuf>,

    /// User agent sent by the tool
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Format selector (default: "bestvideo+bestaudio/best")
    #[serde(default = "default_format")]
    pub format: String,

    /// Skip TLS certificate validation (default: true)
    #[serde(default = "default_true")]
    pub no_check_certificate: bool,

    /// Additional arguments inserted before the URL
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            search_path: true,
            cookies_file: default_cookies_file(),
            user_agent: default_user_agent(),
            format: default_format(),
            no_check_certificate: true,
            extra_args: Vec::new(),
        }
    }
}

/// Object storage backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Google Cloud Storage JSON API
    #[default]
    Gcs,
    /// A local directory acting as the bucket root
    Local,
}

impl std::str::FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gcs" => Ok(StorageBackend::Gcs),
            "local" => Ok(StorageBackend::Local),
            other => Err(Error::Config {
                message: format!("unknown storage backend '{other}' (expected gcs or local)"),
                key: Some("storage.backend".into()),
            }),
        }
    }
}

/// Object storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Storage backend (default: gcs)
    #[serde(default)]
    pub backend: StorageBackend,

    /// Bucket name; uploads are rejected while unset
    #[serde(default)]
    pub bucket: Option<String>,

    /// Directory holding one sub-directory per bucket (local backend only)
    #[serde(default = "default_local_root")]
    #[schema(value_type = String)]
    pub local_root: PathBuf,

    /// Base URL of the GCS JSON API (overridable for emulators and tests)
    #[serde(default = "default_gcs_endpoint")]
    pub gcs_endpoint: String,

    /// Static OAuth access token; fetched from the metadata server when unset
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// Metadata server base URL used to obtain access tokens
    #[serde(default = "default_metadata_endpoint")]
    pub metadata_endpoint: String,

    /// Maximum concurrent file uploads during a folder upload (default: 4)
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,

    /// Upload each completed download to the bucket (default: false)
    #[serde(default)]
    pub upload_completed: bool,

    /// Blob prefix for completed downloads (default: "downloads")
    #[serde(default = "default_download_prefix")]
    pub download_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: None,
            local_root: default_local_root(),
            gcs_endpoint: default_gcs_endpoint(),
            access_token: None,
            metadata_endpoint: default_metadata_endpoint(),
            upload_concurrency: default_upload_concurrency(),
            upload_completed: false,
            download_prefix: default_download_prefix(),
        }
    }
}

/// Job table retention
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobsConfig {
    /// Evict terminal jobs this long after they finished (None = keep forever)
    #[serde(default, with = "optional_duration_serde")]
    #[schema(value_type = Option<u64>)]
    pub ttl: Option<Duration>,

    /// How often the sweeper runs when a TTL is set (default: 60s)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Main configuration for MediaRelay
///
/// Fields are organized into logical sub-configs:
/// - [`server`](ServerConfig) - bind address, CORS, Swagger UI
/// - [`download`](DownloadConfig) - download directory, request blocking mode
/// - [`tool`](ToolConfig) - yt-dlp binary and arguments
/// - [`storage`](StorageConfig) - bucket and backend
/// - [`jobs`](JobsConfig) - job retention
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Fetch tool settings
    #[serde(default)]
    pub tool: ToolConfig,

    /// Object storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Job retention settings
    #[serde(default)]
    pub jobs: JobsConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("invalid config file '{}': {}", path.display(), e),
            key: None,
        })
    }

    /// Check settings that would make the service unusable
    ///
    /// A missing bucket is not an error here: uploads are rejected per request.
    pub fn validate(&self) -> Result<()> {
        if self.storage.upload_concurrency == 0 {
            return Err(Error::Config {
                message: "upload_concurrency must be at least 1".into(),
                key: Some("storage.upload_concurrency".into()),
            });
        }
        if self.jobs.sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "sweep_interval must be greater than zero".into(),
                key: Some("jobs.sweep_interval".into()),
            });
        }
        for (key, value) in [
            ("storage.gcs_endpoint", &self.storage.gcs_endpoint),
            ("storage.metadata_endpoint", &self.storage.metadata_endpoint),
        ] {
            url::Url::parse(value).map_err(|e| Error::Config {
                message: format!("invalid URL '{}': {}", value, e),
                key: Some(key.into()),
            })?;
        }
        if matches!(&self.storage.bucket, Some(b) if b.trim().is_empty()) {
            return Err(Error::Config {
                message: "bucket name must not be blank".into(),
                key: Some("storage.bucket".into()),
            });
        }
        Ok(())
    }

    /// The configured bucket, or a configuration error
    pub fn require_bucket(&self) -> Result<&str> {
        self.storage.bucket.as_deref().ok_or_else(|| Error::Config {
            message: "Server configuration error: storage bucket not set.".into(),
            key: Some("storage.bucket".into()),
        })
    }
}

// Default value functions
fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_true() -> bool {
    true
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_cookies_file() -> Option<PathBuf> {
    Some(PathBuf::from("cookies.txt"))
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.75 Safari/537.36".into()
}

fn default_format() -> String {
    "bestvideo+bestaudio/best".into()
}

fn default_local_root() -> PathBuf {
    PathBuf::from("buckets")
}

fn default_gcs_endpoint() -> String {
    "https://storage.googleapis.com".into()
}

fn default_metadata_endpoint() -> String {
    "http://metadata.google.internal".into()
}

fn default_upload_concurrency() -> usize {
    4
}

fn default_download_prefix() -> String {
    "downloads".into()
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.bind_address.port(), 8080);
        assert_eq!(config.download.download_dir, PathBuf::from("downloads"));
        assert!(!config.download.wait_for_completion);
        assert_eq!(config.tool.format, "bestvideo+bestaudio/best");
        assert_eq!(config.storage.backend, StorageBackend::Gcs);
        assert!(config.storage.bucket.is_none());
        assert!(config.jobs.ttl.is_none());
        assert_eq!(config.jobs.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn durations_deserialize_from_seconds() {
        let config: Config =
            serde_json::from_str(r#"{"jobs": {"ttl": 3600, "sweep_interval": 5}}"#).unwrap();
        assert_eq!(config.jobs.ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.jobs.sweep_interval, Duration::from_secs(5));
    }

    #[test]
    fn duration_serde_rejects_string_instead_of_integer() {
        let result: std::result::Result<Config, _> =
            serde_json::from_str(r#"{"jobs": {"sweep_interval": "5"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn access_token_is_never_serialized() {
        let mut config = Config::default();
        config.storage.access_token = Some("ya29.secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("ya29.secret"));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.storage.upload_concurrency = 0;
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("storage.upload_concurrency"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_unparseable_endpoint() {
        let mut config = Config::default();
        config.storage.gcs_endpoint = "not a url".into();
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("storage.gcs_endpoint"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_missing_bucket() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn require_bucket_reports_config_error() {
        let config = Config::default();
        assert!(matches!(config.require_bucket(), Err(Error::Config { .. })));

        let mut config = Config::default();
        config.storage.bucket = Some("media".into());
        assert_eq!(config.require_bucket().unwrap(), "media");
    }

    #[test]
    fn storage_backend_parses_case_insensitively() {
        assert_eq!("GCS".parse::<StorageBackend>().unwrap(), StorageBackend::Gcs);
        assert_eq!("local".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert!("s3".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storage": {"bucket": "media", "backend": "local"}}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.storage.bucket.as_deref(), Some("media"));
        assert_eq!(config.storage.backend, StorageBackend::Local);
    }

    #[test]
    fn from_file_reports_missing_file() {
        let result = Config::from_file(std::path::Path::new("/nonexistent/config.json"));
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
