use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use cloudinary_uploader::{
    api::CloudinaryClient,
    config::{resolve_with, EffectiveConfig, ExplicitConfig},
    error::UploadErrorKind,
    report::{render, ReportFormat},
    upload::{Executor, UploadRequest, UploadStatus},
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, timeout: Duration) -> EffectiveConfig {
    let explicit = ExplicitConfig {
        cloud_name: Some("demo".into()),
        api_key: Some("123456".into()),
        api_secret: Some("shh".into()),
        concurrent_uploads: Some(2),
        timeout: Some(timeout),
        api_base_url: Some(server.uri()),
        ..Default::default()
    };
    resolve_with(&explicit, None, |_| None).unwrap()
}

fn media_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"not really a picture").unwrap();
    path
}

/// The blocking client must not run on the async runtime's own threads.
async fn run_batch(
    config: EffectiveConfig,
    requests: Vec<UploadRequest>,
    folder: Option<&'static str>,
) -> Vec<cloudinary_uploader::upload::UploadOutcome> {
    tokio::task::spawn_blocking(move || {
        let client = CloudinaryClient::new(&config).unwrap();
        Executor::new(&client, &config).run(requests, folder)
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn uploads_and_maps_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/auto/upload"))
        .and(body_string_contains("name=\"api_key\""))
        .and(body_string_contains("name=\"signature\""))
        .and(body_string_contains("holiday"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "holiday/cat",
            "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/holiday/cat.jpg",
            "resource_type": "image",
            "format": "jpg",
            "bytes": 1048576
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let requests = vec![UploadRequest::new(media_file(&dir, "cat.jpg"))];
    let outcomes = run_batch(config(&server, Duration::from_secs(5)), requests, Some("holiday")).await;

    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.status, UploadStatus::Success);
    assert_eq!(outcome.file_name, "cat.jpg");
    assert_eq!(
        outcome.url.as_deref(),
        Some("https://res.cloudinary.com/demo/image/upload/v1/holiday/cat.jpg")
    );
    assert_eq!(outcome.resource_type.as_deref(), Some("image"));
    assert_eq!(outcome.format.as_deref(), Some("jpg"));
    assert_eq!(outcome.size_bytes, Some(1048576));
    assert!(render(ReportFormat::Grouped, &outcomes).contains("cat.jpg (1.00MB):"));
}

#[tokio::test]
async fn remote_errors_are_isolated_per_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/auto/upload"))
        .and(body_string_contains("filename=\"good.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secure_url": "https://res.cloudinary.com/demo/image/upload/good.png",
            "resource_type": "image",
            "format": "png",
            "bytes": 20
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/auto/upload"))
        .and(body_string_contains("filename=\"denied.png\""))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "error": { "message": "Invalid Signature" } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/auto/upload"))
        .and(body_string_contains("filename=\"odd.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resource_type": "image",
            "bytes": 20
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let requests = vec![
        UploadRequest::new(media_file(&dir, "good.png")),
        UploadRequest::new(media_file(&dir, "denied.png")),
        UploadRequest::new(media_file(&dir, "odd.png")),
    ];
    let outcomes = run_batch(config(&server, Duration::from_secs(5)), requests, None).await;

    let names: Vec<_> = outcomes.iter().map(|o| o.file_name.as_str()).collect();
    assert_eq!(names, vec!["good.png", "denied.png", "odd.png"]);
    assert_eq!(outcomes[0].status, UploadStatus::Success);

    assert_eq!(outcomes[1].status, UploadStatus::Failed);
    assert_eq!(outcomes[1].url, None);
    assert_eq!(outcomes[1].error_kind, Some(UploadErrorKind::Auth));
    assert!(outcomes[1]
        .error_message
        .as_deref()
        .unwrap()
        .contains("Invalid Signature"));

    assert_eq!(outcomes[2].status, UploadStatus::Failed);
    assert_eq!(
        outcomes[2].error_kind,
        Some(UploadErrorKind::MalformedResponse)
    );
}

#[tokio::test]
async fn slow_uploads_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({
                    "secure_url": "https://example.com/late.jpg",
                    "resource_type": "image",
                    "bytes": 1
                })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let requests = vec![UploadRequest::new(media_file(&dir, "late.jpg"))];
    let outcomes = run_batch(config(&server, Duration::from_millis(200)), requests, None).await;

    assert_eq!(outcomes[0].status, UploadStatus::Failed);
    assert_eq!(outcomes[0].error_kind, Some(UploadErrorKind::Timeout));
}

#[tokio::test]
async fn overwrite_is_always_sent() {
    let server = MockServer::start().await;
    let stored = json!({
        "secure_url": "https://res.cloudinary.com/demo/image/upload/logo.png",
        "resource_type": "image",
        "bytes": 20
    });
    Mock::given(method("POST"))
        .and(body_string_contains("filename=\"keep.png\""))
        .and(body_string_contains("name=\"overwrite\"\r\n\r\nfalse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("filename=\"replace.png\""))
        .and(body_string_contains("name=\"overwrite\"\r\n\r\ntrue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let keep = UploadRequest::new(media_file(&dir, "keep.png"));
    let mut replace = UploadRequest::new(media_file(&dir, "replace.png"));
    replace.overwrite = true;
    let outcomes = run_batch(config(&server, Duration::from_secs(5)), vec![keep, replace], None).await;

    assert!(outcomes.iter().all(|o| o.status == UploadStatus::Success));
}
