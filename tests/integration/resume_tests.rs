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

//! End-to-end resume screening submissions.

use serde_json::json;
use tempfile::TempDir;

use minerva::{ExecutionStatus, SubmissionError, UploadedFile};

use crate::workers::{build_engine, echo_worker, write_worker};

fn resumes(count: usize) -> Vec<UploadedFile> {
    (0..count)
        .map(|i| UploadedFile::new(format!("candidate_{}.txt", i), format!("resume {}", i).into_bytes()))
        .collect()
}

const DESCRIPTION: &str = "Senior Rust engineer with async and SQL experience";

#[tokio::test]
async fn test_resume_batch_completes_end_to_end() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = echo_worker(
        workers.path(),
        "screen.sh",
        r#"{"success":true,"total_items":3,"strong_matches":1,"ranking":[],"insights":[],"summary":"Screened 3 resumes"}"#,
    );
    let engine = build_engine(uploads.path(), |c| c.resume_worker(&worker)).await;

    let response = engine
        .submit_resume_screening("user-9", resumes(3), DESCRIPTION)
        .await
        .unwrap();
    assert!(response.success);
    let data = response.data.unwrap();
    assert_eq!(data.get("total_items"), Some(&json!(3)));
    assert_eq!(data.get("strong_matches"), Some(&json!(1)));

    let id = response.execution_id.unwrap();
    let status = engine.get_execution("user-9", id).await.unwrap();
    assert_eq!(status.status, ExecutionStatus::Completed);
    assert_eq!(status.summary.as_deref(), Some("Screened 3 resumes"));

    // Input descriptor reflects the batch size
    let rows = engine.dal().execution().list_for_user("user-9", 10).await.unwrap();
    assert_eq!(rows[0].input_descriptor, "3 files");
}

#[tokio::test]
async fn test_worker_sees_batch_directory_and_description() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    // Counts the files in $1 and echoes $2 back verbatim inside the document
    let worker = write_worker(
        workers.path(),
        "inspect.sh",
        concat!(
            "count=$(ls \"$1\" | wc -l | tr -d ' ')\n",
            "printf '{\"success\":true,\"summary\":\"inspected\",\"files\":%s}' \"$count\"\n",
            "printf '%s' \"$2\" > \"$1/../seen_description.txt\"",
        ),
    );
    let engine = build_engine(uploads.path(), |c| c.resume_worker(&worker)).await;

    // Quotes, backticks, and semicolons must reach the worker untouched
    let adversarial = "need \"rust\" + `tokio`; 5 years; remote";
    let response = engine
        .submit_resume_screening("user-1", resumes(2), adversarial)
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.data.unwrap().get("files"), Some(&json!(2)));

    let seen = std::fs::read_to_string(uploads.path().join("seen_description.txt")).unwrap();
    assert_eq!(seen, adversarial);
}

#[tokio::test]
async fn test_empty_batch_is_rejected_without_a_record() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = echo_worker(workers.path(), "w.sh", "{}");
    let engine = build_engine(uploads.path(), |c| c.resume_worker(&worker)).await;

    let result = engine
        .submit_resume_screening("user-1", vec![], DESCRIPTION)
        .await;
    match result {
        Err(SubmissionError::Validation(message)) => assert!(message.contains("no resume files")),
        other => panic!("expected validation error, got {:?}", other),
    }

    let rows = engine.dal().execution().list_for_user("user-1", 10).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_short_description_is_rejected_naming_the_minimum() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = echo_worker(workers.path(), "w.sh", "{}");
    let engine = build_engine(uploads.path(), |c| {
        c.resume_worker(&worker).min_description_chars(10)
    })
    .await;

    let result = engine
        .submit_resume_screening("user-1", resumes(1), "short")
        .await;
    match result {
        Err(SubmissionError::Validation(message)) => {
            assert!(message.contains("at least 10 characters"))
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_batch_is_rejected() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = echo_worker(workers.path(), "w.sh", "{}");
    let engine = build_engine(uploads.path(), |c| {
        c.resume_worker(&worker).max_resume_files(2)
    })
    .await;

    let result = engine
        .submit_resume_screening("user-1", resumes(3), DESCRIPTION)
        .await;
    assert!(matches!(result, Err(SubmissionError::Validation(_))));
}

#[tokio::test]
async fn test_retrieval_is_refused_for_non_owner() {
    let workers = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let worker = echo_worker(
        workers.path(),
        "screen.sh",
        r#"{"success":true,"summary":"ok","ranking":[]}"#,
    );
    let engine = build_engine(uploads.path(), |c| c.resume_worker(&worker)).await;

    let response = engine
        .submit_resume_screening("owner", resumes(1), DESCRIPTION)
        .await
        .unwrap();
    let id = response.execution_id.unwrap();

    assert!(engine.get_execution("owner", id).await.is_ok());
    assert!(matches!(
        engine.get_execution("intruder", id).await,
        Err(SubmissionError::Forbidden(_))
    ));
}
