//! Command-line entry point for the media-relay service.

use clap::Parser;
use media_relay::{Config, MediaRelay, StorageBackend};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Serve the media-relay HTTP API
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON configuration file; flags and environment override its values
    #[arg(short, long, env = "MEDIA_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "HOST")]
    host: Option<std::net::IpAddr>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Bucket that folder uploads go to
    #[arg(long, env = "GCS_BUCKET_NAME")]
    bucket: Option<String>,

    /// Storage backend (gcs or local)
    #[arg(long, env = "STORAGE_BACKEND")]
    storage_backend: Option<StorageBackend>,

    /// Directory containing one subdirectory per bucket (local backend)
    #[arg(long, env = "LOCAL_BUCKET_ROOT")]
    local_bucket_root: Option<PathBuf>,

    /// Directory downloads are written to
    #[arg(long, env = "DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Path to the yt-dlp executable
    #[arg(long, env = "YT_DLP_PATH")]
    yt_dlp_path: Option<PathBuf>,

    /// Drop finished jobs after this many seconds
    #[arg(long, env = "JOB_TTL_SECS")]
    job_ttl_secs: Option<u64>,

    /// Answer POST /download only once the job has finished
    #[arg(long, env = "WAIT_FOR_COMPLETION")]
    wait_for_completion: Option<bool>,
}

impl Args {
    fn into_config(self) -> media_relay::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if self.host.is_some() || self.port.is_some() {
            let current = config.server.bind_address;
            config.server.bind_address = SocketAddr::new(
                self.host.unwrap_or(current.ip()),
                self.port.unwrap_or(current.port()),
            );
        }
        if let Some(bucket) = self.bucket.filter(|b| !b.is_empty()) {
            config.storage.bucket = Some(bucket);
        }
        if let Some(backend) = self.storage_backend {
            config.storage.backend = backend;
        }
        if let Some(root) = self.local_bucket_root {
            config.storage.local_root = root;
        }
        if let Some(dir) = self.download_dir {
            config.download.download_dir = dir;
        }
        if let Some(path) = self.yt_dlp_path {
            config.tool.binary_path = Some(path);
        }
        if let Some(secs) = self.job_ttl_secs {
            config.jobs.ttl = Some(Duration::from_secs(secs));
        }
        if let Some(wait) = self.wait_for_completion {
            config.download.wait_for_completion = wait;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!(?args, "CLI arguments parsed");

    let config = args.into_config()?;
    let relay = Arc::new(MediaRelay::new(config).await?);

    let sweeper = relay.start_job_sweeper();
    let mut server = relay.spawn_api_server();

    // A bind failure ends the server task before any signal arrives
    let early_exit = tokio::select! {
        result = media_relay::run_with_shutdown(&relay) => {
            result?;
            None
        }
        joined = &mut server => Some(joined),
    };

    match early_exit {
        Some(joined) => {
            relay.shutdown().await?;
            joined??;
        }
        None => server.await??,
    }

    sweeper.await?;
    tracing::info!("media-relay stopped");
    Ok(())
}
