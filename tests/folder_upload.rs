//! Folder uploads into a local bucket

mod common;

use common::{bucket_dir, create_relay, test_config};
use media_relay::{Config, Error, MediaRelay, UploadStatus};
use std::path::Path;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn nested_tree_is_mirrored_under_prefix() {
    let temp_dir = tempfile::tempdir().unwrap();
    let relay = create_relay(&temp_dir, test_config(&temp_dir), None).await;

    let source = temp_dir.path().join("photos");
    write(&source.join("a.jpg"), "a");
    write(&source.join("2024/b.jpg"), "b");
    write(&source.join("2024/summer/c.jpg"), "c");
    std::fs::create_dir_all(source.join("empty")).unwrap();

    let summary = relay.upload_folder(&source, "archive/").await.unwrap();

    assert_eq!(summary.status, UploadStatus::Completed);
    assert_eq!(summary.uploaded_files_count, 3);
    assert_eq!(summary.skipped_folders_count, 0);
    assert_eq!(summary.permission_error_count, 0);
    assert_eq!(summary.upload_error_count, 0);

    let bucket = bucket_dir(&temp_dir);
    for (blob, contents) in [
        ("archive/a.jpg", "a"),
        ("archive/2024/b.jpg", "b"),
        ("archive/2024/summer/c.jpg", "c"),
    ] {
        assert_eq!(std::fs::read_to_string(bucket.join(blob)).unwrap(), contents);
    }
    assert!(!bucket.join("archive/empty").exists());
}

#[tokio::test]
async fn uploading_twice_overwrites() {
    let temp_dir = tempfile::tempdir().unwrap();
    let relay = create_relay(&temp_dir, test_config(&temp_dir), None).await;

    let source = temp_dir.path().join("src");
    write(&source.join("f.txt"), "first");
    relay.upload_folder(&source, "p").await.unwrap();

    write(&source.join("f.txt"), "second");
    let summary = relay.upload_folder(&source, "p").await.unwrap();

    assert_eq!(summary.uploaded_files_count, 1);
    assert_eq!(
        std::fs::read_to_string(bucket_dir(&temp_dir).join("p/f.txt")).unwrap(),
        "second"
    );
}

#[tokio::test]
async fn file_as_source_is_not_found() {
    let temp_dir = tempfile::tempdir().unwrap();
    let relay = create_relay(&temp_dir, test_config(&temp_dir), None).await;

    let file = temp_dir.path().join("plain.txt");
    write(&file, "x");

    assert!(matches!(
        relay.upload_folder(&file, "p").await,
        Err(Error::SourceFolderNotFound(_))
    ));
}

#[tokio::test]
async fn no_bucket_means_config_error() {
    let relay = MediaRelay::with_components(Config::default(), None, None);
    let temp_dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        relay.upload_folder(temp_dir.path(), "p").await,
        Err(Error::Config { .. })
    ));
}
