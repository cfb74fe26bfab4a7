//! Recursive folder upload into object storage
//!
//! The folder is walked on a blocking thread first, producing a plan of
//! `(local file, blob name)` pairs plus walk-error counters. The plan is then
//! uploaded with bounded concurrency. A failure on one folder or file never
//! aborts the rest of the upload; everything is tallied in the
//! [`UploadSummary`].

use crate::error::{Error, Result, StorageError};
use crate::storage::BlobStore;
use crate::types::{UploadStatus, UploadSummary};
use crate::utils::blob_name;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Files to upload and the problems met while listing them
#[derive(Debug, Default)]
struct UploadPlan {
    files: Vec<(PathBuf, String)>,
    skipped_folders: usize,
    permission_errors: usize,
}

/// Uploads local folders into one bucket
#[derive(Clone)]
pub struct FolderUploader {
    store: Arc<dyn BlobStore>,
    concurrency: usize,
}

impl FolderUploader {
    /// Create an uploader writing through `store` with at most `concurrency`
    /// transfers in flight
    pub fn new(store: Arc<dyn BlobStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Upload every regular file below `source` as `<prefix>/<relative path>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceFolderNotFound`] when `source` is not an existing
    /// directory. Per-folder and per-file failures are counted in the summary
    /// instead.
    pub async fn upload_folder(&self, source: &Path, prefix: &str) -> Result<UploadSummary> {
        let is_dir = tokio::fs::metadata(source)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(Error::SourceFolderNotFound(source.to_path_buf()));
        }

        tracing::info!(
            source = %source.display(),
            bucket = %self.store.bucket(),
            prefix = %prefix,
            "Starting folder upload"
        );

        let plan = {
            let source = source.to_path_buf();
            let prefix = prefix.to_string();
            tokio::task::spawn_blocking(move || plan_upload(&source, &prefix))
                .await
                .map_err(|e| Error::Other(format!("folder walk task failed: {}", e)))?
        };

        let results: Vec<std::result::Result<(), StorageError>> = stream::iter(plan.files)
            .map(|(path, blob)| {
                let store = self.store.clone();
                async move {
                    let result = store.put_file(&path, &blob).await;
                    if let Err(e) = &result {
                        tracing::error!(
                            file = %path.display(),
                            blob = %blob,
                            error = %e,
                            "File upload failed"
                        );
                    }
                    result
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut uploaded = 0;
        let mut permission_errors = plan.permission_errors;
        let mut upload_errors = 0;
        for result in results {
            match result {
                Ok(()) => uploaded += 1,
                Err(e) if e.is_permission_denied() => permission_errors += 1,
                Err(_) => upload_errors += 1,
            }
        }

        let status = if permission_errors > 0 || upload_errors > 0 {
            UploadStatus::CompletedWithErrors
        } else {
            UploadStatus::Completed
        };

        tracing::info!(
            source = %source.display(),
            uploaded,
            skipped_folders = plan.skipped_folders,
            permission_errors,
            upload_errors,
            "Folder upload finished"
        );

        Ok(UploadSummary {
            status,
            source_folder: source.to_path_buf(),
            destination_prefix: prefix.to_string(),
            uploaded_files_count: uploaded,
            skipped_folders_count: plan.skipped_folders,
            permission_error_count: permission_errors,
            upload_error_count: upload_errors,
        })
    }
}

fn plan_upload(source: &Path, prefix: &str) -> UploadPlan {
    let mut plan = UploadPlan::default();

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                plan.permission_errors += 1;
                if e.path().is_some_and(Path::is_dir) {
                    plan.skipped_folders += 1;
                }
                tracing::warn!(
                    path = ?e.path(),
                    error = %e,
                    "Skipping unreadable path during folder walk"
                );
                continue;
            }
        };

        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }

        // Entries always live below the walk root
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        plan.files
            .push((entry.path().to_path_buf(), blob_name(prefix, relative)));
    }

    plan
}
