//! Shared test helpers for creating MediaRelay instances in tests.

use super::MediaRelay;
use crate::config::{Config, StorageBackend};
use crate::fetcher::FetchTool;
use crate::storage::{BlobStore, LocalBlobStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

/// Bucket name used by test relays
pub(crate) const TEST_BUCKET: &str = "test-bucket";

fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.tool.binary_path = None;
    config.tool.search_path = false;
    config.tool.cookies_file = None;
    config.storage.backend = StorageBackend::Local;
    config.storage.bucket = Some(TEST_BUCKET.to_string());
    config.storage.local_root = temp_dir.path().join("buckets");
    config
}

fn local_store(config: &Config) -> Arc<dyn BlobStore> {
    Arc::new(LocalBlobStore::new(
        config.storage.local_root.clone(),
        TEST_BUCKET,
    ))
}

/// Relay without a fetch tool, writing uploads to a local bucket.
/// Returns the relay and the tempdir (which must be kept alive).
pub(crate) fn create_test_relay() -> (MediaRelay, TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(&temp_dir);
    std::fs::create_dir_all(&config.download.download_dir).unwrap();

    let store = local_store(&config);
    (
        MediaRelay::with_components(config, None, Some(store)),
        temp_dir,
    )
}

/// Relay whose fetch tool is a shell script with `body` after an argument
/// prologue that stores the `-o` value in `$out`.
#[cfg(unix)]
pub(crate) fn create_test_relay_with_tool(body: &str) -> (MediaRelay, TempDir) {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = tempdir().unwrap();
    let config = test_config(&temp_dir);
    std::fs::create_dir_all(&config.download.download_dir).unwrap();

    let script = temp_dir.path().join("fake-yt-dlp");
    let prologue = "#!/bin/sh\nout=\"\"\nwhile [ $# -gt 0 ]; do\n  case \"$1\" in\n    -o) out=\"$2\"; shift 2 ;;\n    *) shift ;;\n  esac\ndone\n";
    std::fs::write(&script, format!("{prologue}{body}")).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let tool = FetchTool::new(script, config.tool.clone());
    let store = local_store(&config);
    (
        MediaRelay::with_components(config, Some(tool), Some(store)),
        temp_dir,
    )
}

/// Directory holding the test bucket's objects
pub(crate) fn store_in(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("buckets").join(TEST_BUCKET)
}
