//! The HTTP API served on a real socket

mod common;

use common::{bucket_dir, create_relay, free_port, test_config};
use serde_json::{Value, json};
use std::time::Duration;

async fn wait_until_listening(base: &str) -> reqwest::Client {
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if client.get(format!("{base}/health")).send().await.is_ok() {
            return client;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {base} never came up");
}

#[tokio::test]
async fn serves_requests_until_shutdown() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&temp_dir);
    let port = free_port();
    config.server.bind_address = ([127, 0, 0, 1], port).into();
    let relay = create_relay(&temp_dir, config, None).await;

    let server = relay.spawn_api_server();
    let base = format!("http://127.0.0.1:{port}");
    let client = wait_until_listening(&base).await;

    // Download validation
    let response = client
        .post(format!("{base}/download"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "URL is required");

    // Accepted job is immediately visible
    let response = client
        .post(format!("{base}/download"))
        .json(&json!({"url": "https://example.com/v"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let response = client
        .get(format!("{base}/status/{job_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{base}/status/unknown"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Folder upload
    let source = temp_dir.path().join("upload-me");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::write(source.join("x.bin"), b"xyz").unwrap();

    let response = client
        .post(format!("{base}/upload-folder"))
        .json(&json!({"source_folder": source, "destination_prefix": "dest"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["uploaded_files_count"], 1);
    assert!(bucket_dir(&temp_dir).join("dest/x.bin").is_file());

    drop(client);
    relay.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}
