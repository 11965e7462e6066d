/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! End-to-end dataset analysis submissions against real stub workers.

use std::time::{Duration, Instant};

use serde_json::json;
use serial_test::serial;
use tempfile::TempDir;

use minerva::{ExecutionStatus, SubmissionError, UploadedFile};

use crate::workers::{build_engine, echo_worker, write_worker};

fn csv() -> UploadedFile {
    UploadedFile::new("sales.csv", b"region,revenue\nwest,100\neast,90\n".to_vec())
}

#[tokio::test]
async fn test_dataset_submission_completes_end_to_end() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = echo_worker(
        workers.path(),
        "analyze.sh",
        r#"{"success":true,"summary":"ok","statistics":{},"insights":[]}"#,
    );
    let engine = build_engine(uploads.path(), |c| c.dataset_worker(&worker)).await;

    let response = engine.submit_dataset_analysis("user-42", csv()).await.unwrap();
    assert!(response.success);
    let id = response.execution_id.expect("execution id");

    // data is the worker document, verbatim
    let data = response.data.unwrap();
    assert_eq!(data.get("success"), Some(&json!(true)));
    assert_eq!(data.get("summary"), Some(&json!("ok")));
    assert_eq!(data.get("statistics"), Some(&json!({})));

    let status = engine.get_execution("user-42", id).await.unwrap();
    assert_eq!(status.status, ExecutionStatus::Completed);
    assert_eq!(status.summary.as_deref(), Some("ok"));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_worker_receives_stored_file_and_execution_id() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    // Echoes its argv back inside the document
    let worker = write_worker(
        workers.path(),
        "argv.sh",
        r#"printf '{"success":true,"summary":"args","file":"%s","execution":"%s"}' "$1" "$2""#,
    );
    let engine = build_engine(uploads.path(), |c| c.dataset_worker(&worker)).await;

    let response = engine.submit_dataset_analysis("user-1", csv()).await.unwrap();
    let id = response.execution_id.unwrap();
    let data = response.data.unwrap();

    let file_arg = data.get("file").unwrap().as_str().unwrap();
    assert!(file_arg.ends_with(&format!("{}.csv", id)));
    assert_eq!(data.get("execution").unwrap().as_str().unwrap(), id.to_string());
}

#[tokio::test]
async fn test_upload_is_removed_after_completion() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = echo_worker(
        workers.path(),
        "analyze.sh",
        r#"{"success":true,"summary":"ok"}"#,
    );
    let engine = build_engine(uploads.path(), |c| c.dataset_worker(&worker)).await;

    let response = engine.submit_dataset_analysis("user-1", csv()).await.unwrap();
    let id = response.execution_id.unwrap();
    let stored = uploads.path().join(format!("{}.csv", id));

    // Cleanup is spawned after the submission returns
    for _ in 0..100 {
        if !stored.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!stored.exists());
}

#[tokio::test]
async fn test_log_padded_worker_output_is_recovered() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = write_worker(
        workers.path(),
        "chatty.sh",
        concat!(
            "echo 'INFO: loading model'\n",
            r#"printf '%s\n' '{"success":true,"summary":"recovered","insights":["x"]}'"#,
            "\necho 'INFO: done'",
        ),
    );
    let engine = build_engine(uploads.path(), |c| c.dataset_worker(&worker)).await;

    let response = engine.submit_dataset_analysis("user-1", csv()).await.unwrap();
    assert!(response.success);
    assert_eq!(
        response.data.unwrap().get("summary"),
        Some(&json!("recovered"))
    );
}

#[tokio::test]
async fn test_garbage_stdout_fails_with_invalid_format() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = write_worker(
        workers.path(),
        "garbage.sh",
        "echo 'Traceback (most recent call last):'",
    );
    let engine = build_engine(uploads.path(), |c| c.dataset_worker(&worker)).await;

    let response = engine.submit_dataset_analysis("user-1", csv()).await.unwrap();
    assert!(!response.success);
    assert!(response.error.unwrap().contains("invalid output format"));

    let id = response.execution_id.unwrap();
    let status = engine.get_execution("user-1", id).await.unwrap();
    assert_eq!(status.status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn test_silent_worker_fails_with_no_output() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = write_worker(workers.path(), "silent.sh", "exit 0");
    let engine = build_engine(uploads.path(), |c| c.dataset_worker(&worker)).await;

    let response = engine.submit_dataset_analysis("user-1", csv()).await.unwrap();
    assert!(!response.success);
    assert!(response.error.unwrap().contains("no output"));
}

#[tokio::test]
async fn test_crashing_worker_fails_with_exit_code() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = write_worker(
        workers.path(),
        "crash.sh",
        "echo 'model load failed' >&2\nexit 2",
    );
    let engine = build_engine(uploads.path(), |c| c.dataset_worker(&worker)).await;

    let response = engine.submit_dataset_analysis("user-1", csv()).await.unwrap();
    assert!(!response.success);
    let error = response.error.unwrap();
    assert!(error.contains("code 2"));
    assert!(error.contains("model load failed"));
}

#[tokio::test]
#[serial]
async fn test_hung_worker_is_killed_within_budget() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = write_worker(workers.path(), "hang.sh", "sleep 30");
    let engine = build_engine(uploads.path(), |c| {
        c.dataset_worker(&worker)
            .dataset_timeout(Duration::from_millis(300))
    })
    .await;

    let started = Instant::now();
    let response = engine.submit_dataset_analysis("user-1", csv()).await.unwrap();
    let elapsed = started.elapsed();

    assert!(!response.success);
    assert!(response.error.unwrap().contains("timed out"));
    assert!(elapsed < Duration::from_secs(10), "took {:?}", elapsed);

    let id = response.execution_id.unwrap();
    let status = engine.get_execution("user-1", id).await.unwrap();
    assert_eq!(status.status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn test_worker_reported_failure_stores_document() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = echo_worker(
        workers.path(),
        "refuse.sh",
        r#"{"success":false,"error":"No numeric columns found","summary":"Processing failed"}"#,
    );
    let engine = build_engine(uploads.path(), |c| c.dataset_worker(&worker)).await;

    let response = engine.submit_dataset_analysis("user-1", csv()).await.unwrap();
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("No numeric columns found"));

    let id = response.execution_id.unwrap();
    let status = engine.get_execution("user-1", id).await.unwrap();
    assert_eq!(status.status, ExecutionStatus::Failed);
    assert_eq!(
        status.data.unwrap().get("error"),
        Some(&json!("No numeric columns found"))
    );
}

#[tokio::test]
async fn test_rejected_upload_creates_no_execution() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = echo_worker(workers.path(), "w.sh", "{}");
    let engine = build_engine(uploads.path(), |c| c.dataset_worker(&worker)).await;

    let result = engine
        .submit_dataset_analysis("user-1", UploadedFile::new("report.pdf", b"pdf".to_vec()))
        .await;
    assert!(matches!(result, Err(SubmissionError::Validation(_))));

    let rows = engine
        .dal()
        .execution()
        .list_for_user("user-1", 10)
        .await
        .unwrap();
    assert!(rows.is_empty());
}
