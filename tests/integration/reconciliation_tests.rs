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

//! Reconciliation of executions abandoned by a crashed host.

use chrono::{Duration as ChronoDuration, Utc};
use uuid::Uuid;

use minerva::recovery::ReconciliationService;
use minerva::{
    Database, EngineConfig, ExecutionStatus, ExecutionTracker, JobKind, DAL,
};

async fn tracker() -> ExecutionTracker {
    let db = Database::new(":memory:", 1);
    db.run_migrations().await.unwrap();
    ExecutionTracker::new(DAL::new(db))
}

#[tokio::test]
async fn test_sweep_reconciles_rows_left_running_by_a_crash() {
    let tracker = tracker().await;

    // Simulate a crash: running row with no live worker behind it
    let abandoned = Uuid::new_v4();
    tracker
        .create(abandoned, "user-1", JobKind::DatasetAnalysis, "lost.csv")
        .await
        .unwrap();
    tracker.mark_running(abandoned).await.unwrap();

    let completed = Uuid::new_v4();
    tracker
        .create(completed, "user-1", JobKind::DatasetAnalysis, "done.csv")
        .await
        .unwrap();
    tracker.mark_running(completed).await.unwrap();
    let document = serde_json::json!({"success": true, "summary": "ok"})
        .as_object()
        .unwrap()
        .clone();
    tracker.complete(completed, document, "ok").await.unwrap();

    let service = ReconciliationService::new(tracker.clone(), EngineConfig::default());

    // Past the staleness cutoff for dataset workers
    let later = Utc::now() + ChronoDuration::hours(1);
    assert_eq!(service.sweep_at(later).await, 1);

    let execution = tracker.get(abandoned).await.unwrap().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error_message.unwrap().contains("abandoned"));
    assert!(execution.completed_at.is_some());

    // The completed row is untouched
    let execution = tracker.get(completed).await.unwrap().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_sweep_respects_per_kind_budgets() {
    let tracker = tracker().await;

    let screening = Uuid::new_v4();
    tracker
        .create(screening, "user-1", JobKind::ResumeScreening, "4 files")
        .await
        .unwrap();
    tracker.mark_running(screening).await.unwrap();

    let config = EngineConfig::default();
    let service = ReconciliationService::new(tracker.clone(), config.clone());

    // Stale for dataset budgets but not yet for the longer screening budget
    let between = Utc::now() + ChronoDuration::from_std(config.stale_after(JobKind::DatasetAnalysis)).unwrap()
        + ChronoDuration::seconds(5);
    assert!(between < Utc::now() + ChronoDuration::from_std(config.stale_after(JobKind::ResumeScreening)).unwrap());
    assert_eq!(service.sweep_at(between).await, 0);

    let after = Utc::now() + ChronoDuration::hours(2);
    assert_eq!(service.sweep_at(after).await, 1);
}
