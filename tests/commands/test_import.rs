//! End-to-end tests for the import command against a mock endpoint

use httpmock::prelude::*;
use serde_json::{json, Value};
use std::fs;
use tempfile::{tempdir, TempDir};

use tg_history_import::commands::{import_run, RunOptions};
use tg_history_import::{BatchOutcome, Error, ImportConfig};

const SECRET: &str = "test_admin_secret";

fn photo_messages(count: i64) -> Value {
    let messages: Vec<Value> = (1..=count)
        .map(|id| json!({"id": id, "type": "message", "photo": format!("photos/{}.jpg", id)}))
        .collect();
    Value::Array(messages)
}

fn setup(server: &MockServer, messages: Value) -> (TempDir, ImportConfig) {
    let tmp = tempdir().expect("tempdir");
    let input = tmp.path().join("result.json");
    fs::write(&input, json!({ "messages": messages }).to_string()).unwrap();

    let config = ImportConfig {
        endpoint: server.url("/api/import"),
        admin_secret: SECRET.to_string(),
        input,
        chat_id: -1001234567890,
        category: "History".to_string(),
        batch_size: 50,
        delay_ms: 0,
        timeout_secs: 5,
    };
    (tmp, config)
}

/// (number of records, first message_id) of an import request body.
fn batch_shape(body: &[u8]) -> Option<(usize, i64)> {
    let body: Value = serde_json::from_slice(body).ok()?;
    let data = body.get("data")?.as_array()?;
    let first = data.first()?.get("message_id")?.as_i64()?;
    Some((data.len(), first))
}

#[tokio::test]
async fn test_import_sends_three_batches_for_120_records() {
    let server = MockServer::start_async().await;

    let first = server.mock(|when, then| {
        when.method(POST)
            .path("/api/import")
            .header("authorization", SECRET)
            .header("content-type", "application/json")
            .is_true(|req| batch_shape(req.body().as_ref()) == Some((50, 1)));
        then.status(200).json_body(json!({"ok": true}));
    });
    let second = server.mock(|when, then| {
        when.method(POST)
            .path("/api/import")
            .is_true(|req| batch_shape(req.body().as_ref()) == Some((50, 51)));
        then.status(200).json_body(json!({"ok": true}));
    });
    let third = server.mock(|when, then| {
        when.method(POST)
            .path("/api/import")
            .is_true(|req| batch_shape(req.body().as_ref()) == Some((20, 101)));
        then.status(200).json_body(json!({"ok": true}));
    });

    let (_tmp, config) = setup(&server, photo_messages(120));
    let summary = import_run(&config, RunOptions::default()).await.unwrap();

    first.assert_calls(1);
    second.assert_calls(1);
    third.assert_calls(1);

    let report = summary.upload.expect("upload report");
    assert_eq!(report.batches_attempted, 3);
    assert_eq!(report.uploaded_records, 120);
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_failed_middle_batch_does_not_stop_import() {
    let server = MockServer::start_async().await;

    let ok = server.mock(|when, then| {
        when.method(POST)
            .path("/api/import")
            .is_true(|req| {
                matches!(
                    batch_shape(req.body().as_ref()),
                    Some((_, 1)) | Some((_, 101))
                )
            });
        then.status(200);
    });
    let failing = server.mock(|when, then| {
        when.method(POST)
            .path("/api/import")
            .is_true(|req| batch_shape(req.body().as_ref()) == Some((50, 51)));
        then.status(500).body("D1 write failed");
    });

    let (_tmp, config) = setup(&server, photo_messages(120));
    let summary = import_run(&config, RunOptions::default()).await.unwrap();

    ok.assert_calls(2);
    failing.assert_calls(1);

    let report = summary.upload.expect("upload report");
    assert_eq!(report.batches_attempted, 3);
    assert_eq!(report.uploaded_records, 70);
    assert_eq!(report.failed_batches.len(), 1);
    assert_eq!(report.failed_batches[0].index, 1);
    assert_eq!(
        report.failed_batches[0].outcome,
        BatchOutcome::Rejected {
            status: 500,
            body: "D1 write failed".to_string()
        }
    );
}

#[tokio::test]
async fn test_no_media_makes_no_requests() {
    let server = MockServer::start_async().await;
    let any = server.mock(|when, then| {
        when.method(POST).path("/api/import");
        then.status(200);
    });

    let (_tmp, config) = setup(
        &server,
        json!([
            {"id": 1, "type": "message", "text": "hello"},
            {"id": 2, "type": "service", "action": "pin_message"}
        ]),
    );
    let summary = import_run(&config, RunOptions::default()).await.unwrap();

    any.assert_calls(0);
    assert_eq!(summary.extraction.emitted, 0);
    assert!(summary.upload.is_none());
}

#[tokio::test]
async fn test_wire_record_shape() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/import").json_body(json!({
            "data": [{
                "message_id": 9,
                "chat_id": -1001234567890i64,
                "topic_id": null,
                "category_name": "History",
                "file_unique_id": "import_-1001234567890_9",
                "file_id": "",
                "media_type": "video",
                "caption": "Look here"
            }]
        }));
        then.status(200);
    });

    let (_tmp, config) = setup(
        &server,
        json!([{
            "id": 9,
            "type": "message",
            "media_type": "video_file",
            "text": ["Look ", {"type": "bold", "text": "here"}]
        }]),
    );
    import_run(&config, RunOptions::default()).await.unwrap();

    mock.assert_calls(1);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_reported_per_batch() {
    let server = MockServer::start_async().await;
    let (_tmp, mut config) = setup(&server, photo_messages(3));
    config.endpoint = "http://127.0.0.1:1/api/import".to_string();
    config.batch_size = 2;
    config.timeout_secs = 2;

    let summary = import_run(&config, RunOptions::default()).await.unwrap();
    let report = summary.upload.expect("upload report");

    assert_eq!(report.batches_attempted, 2);
    assert_eq!(report.uploaded_records, 0);
    assert_eq!(report.failed_records(), 3);
    assert!(report
        .failed_batches
        .iter()
        .all(|f| matches!(f.outcome, BatchOutcome::Transport { .. })));
}

#[tokio::test]
async fn test_missing_export_file_is_fatal() {
    let server = MockServer::start_async().await;
    let any = server.mock(|when, then| {
        when.method(POST).path("/api/import");
        then.status(200);
    });

    let (tmp, mut config) = setup(&server, json!([]));
    config.input = tmp.path().join("does_not_exist.json");

    let err = import_run(&config, RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::InputNotFound(_)));
    any.assert_calls(0);
}
