//! Relay construction and fake yt-dlp scripts

use media_relay::config::ToolConfig;
use media_relay::{BlobStore, Config, FetchTool, LocalBlobStore, MediaRelay, StorageBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Bucket name used by every test relay
pub const TEST_BUCKET: &str = "integration-bucket";

/// Argument prologue: stores the `-o` value in `$out` and the URL (last
/// positional argument) in `$url`
pub const PARSE_ARGS: &str = r#"#!/bin/sh
out=""
url=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -*) shift ;;
    *) url="$1"; shift ;;
  esac
done
"#;

/// Tool that reports progress and metadata, then writes the file
pub const SUCCESSFUL_TOOL: &str = r#"
echo '{"progress": 10}'
echo '{"downloaded_bytes": 500, "total_bytes": 1000}'
echo '{"title": "Integration Clip", "format_note": "1080p", "duration": 3600}'
echo '{"progress": 100}'
printf '%s' "$url" > "$out"
"#;

/// Tool that fails with a yt-dlp style error line
pub const FAILING_TOOL: &str = r#"
echo 'WARNING: something odd' >&2
echo 'ERROR: [generic] Unsupported URL: nope' >&2
exit 1
"#;

/// Write an executable fake yt-dlp into `dir`
#[cfg(unix)]
pub fn write_fake_tool(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-yt-dlp");
    std::fs::write(&script, format!("{PARSE_ARGS}{body}")).expect("write fake tool");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
        .expect("make fake tool executable");
    script
}

/// Configuration rooted in `temp_dir` with a local bucket
pub fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.tool.search_path = false;
    config.tool.cookies_file = None;
    config.storage.backend = StorageBackend::Local;
    config.storage.bucket = Some(TEST_BUCKET.to_string());
    config.storage.local_root = temp_dir.path().join("buckets");
    config
}

/// Directory holding the test bucket's objects
pub fn bucket_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("buckets").join(TEST_BUCKET)
}

/// Build a relay from `config`, using `tool_body` as the fake yt-dlp
pub async fn create_relay(
    temp_dir: &TempDir,
    config: Config,
    tool_body: Option<&str>,
) -> Arc<MediaRelay> {
    std::fs::create_dir_all(&config.download.download_dir).expect("create download dir");

    #[cfg(unix)]
    let tool = tool_body.map(|body| {
        FetchTool::new(write_fake_tool(temp_dir.path(), body), ToolConfig {
            cookies_file: None,
            ..config.tool.clone()
        })
    });
    #[cfg(not(unix))]
    let tool: Option<FetchTool> = {
        let _ = tool_body;
        None
    };

    let store: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
        config.storage.local_root.clone(),
        TEST_BUCKET,
    ));
    Arc::new(MediaRelay::with_components(config, tool, Some(store)))
}

/// Reserve a free localhost port
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("reserve port")
}
