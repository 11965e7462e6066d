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

//! Submission orchestration.
//!
//! [`AnalysisEngine`] is the public entry point: it validates inbound
//! submissions, creates the execution record, materializes the input on
//! disk, invokes the external worker under a concurrency cap, drives the
//! lifecycle to a terminal state, and shapes the response envelope.
//!
//! Worker failures are not errors at this boundary. A timeout, crash, or
//! malformed document terminates the execution as `failed` and still
//! yields an envelope carrying the execution id; only structural
//! validation and infrastructure faults surface as [`SubmissionError`].

mod envelope;
mod upload;
mod validation;

pub use envelope::{ExecutionStatusResponse, SubmissionResponse};
pub use validation::UploadedFile;

use std::sync::Arc;

use tokio::sync::{watch, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::dal::DAL;
use crate::database::Database;
use crate::error::{StorageError, SubmissionError, TrackerError};
use crate::models::{ExecutionStatus, JobKind};
use crate::recovery::ReconciliationService;
use crate::tracker::ExecutionTracker;
use crate::worker::{
    parse_worker_output, InvocationOutcome, ProcessWorkerInvoker, WorkerInvoker,
};

/// The analysis job execution engine.
///
/// Cheap to clone; clones share the pool, the worker slots, and the
/// background reconciliation service.
#[derive(Clone)]
pub struct AnalysisEngine {
    config: Arc<EngineConfig>,
    database: Database,
    tracker: ExecutionTracker,
    invoker: Arc<dyn WorkerInvoker>,
    worker_slots: Arc<Semaphore>,
    background: Arc<RwLock<BackgroundHandles>>,
}

/// Handles for the background reconciliation loop.
struct BackgroundHandles {
    reconciliation: Option<(JoinHandle<()>, watch::Sender<bool>)>,
}

impl AnalysisEngine {
    /// Creates a builder.
    pub fn builder() -> AnalysisEngineBuilder {
        AnalysisEngineBuilder::new()
    }

    /// Submits a single dataset file for analysis.
    ///
    /// Blocks until the execution reaches a terminal state; the returned
    /// envelope always carries the execution id once a record exists.
    pub async fn submit_dataset_analysis(
        &self,
        user_id: &str,
        file: UploadedFile,
    ) -> Result<SubmissionResponse, SubmissionError> {
        validation::validate_dataset_file(&file, &self.config)?;

        let execution_id = Uuid::new_v4();
        self.tracker
            .create(
                execution_id,
                user_id,
                JobKind::DatasetAnalysis,
                &file.file_name,
            )
            .await?;

        let guard = match upload::store_dataset_file(
            &self.config.upload_root,
            execution_id,
            &file,
        )
        .await
        {
            Ok(guard) => guard,
            Err(e) => return self.fail_before_invocation(execution_id, e).await,
        };

        let args = vec![
            guard.path().display().to_string(),
            execution_id.to_string(),
        ];
        self.run_to_terminal(execution_id, JobKind::DatasetAnalysis, args, guard)
            .await
    }

    /// Submits a batch of resume files to screen against a job description.
    pub async fn submit_resume_screening(
        &self,
        user_id: &str,
        files: Vec<UploadedFile>,
        job_description: &str,
    ) -> Result<SubmissionResponse, SubmissionError> {
        validation::validate_resume_batch(&files, job_description, &self.config)?;

        let execution_id = Uuid::new_v4();
        let descriptor = format!("{} files", files.len());
        self.tracker
            .create(execution_id, user_id, JobKind::ResumeScreening, &descriptor)
            .await?;

        let guard = match upload::store_resume_batch(
            &self.config.upload_root,
            execution_id,
            &files,
            self.config.resume_dir_retention,
        )
        .await
        {
            Ok(guard) => guard,
            Err(e) => return self.fail_before_invocation(execution_id, e).await,
        };

        // Free text goes through argv, never a shell line: quotes and
        // metacharacters must reach the worker byte-for-byte.
        let args = vec![
            guard.path().display().to_string(),
            job_description.to_string(),
            execution_id.to_string(),
        ];
        self.run_to_terminal(execution_id, JobKind::ResumeScreening, args, guard)
            .await
    }

    /// Retrieves one execution's status and stored result.
    ///
    /// Refused when `user_id` does not own the execution.
    pub async fn get_execution(
        &self,
        user_id: &str,
        execution_id: Uuid,
    ) -> Result<ExecutionStatusResponse, SubmissionError> {
        let execution = self
            .tracker
            .get(execution_id)
            .await?
            .ok_or(SubmissionError::NotFound(execution_id))?;
        if execution.user_id != user_id {
            warn!(execution_id = %execution_id, "ownership check failed");
            return Err(SubmissionError::Forbidden(execution_id));
        }

        let result = self.tracker.get_result(execution_id).await?;
        let (data, summary) = match result {
            Some(result) => (Some(result.document), Some(result.summary)),
            None => (None, None),
        };
        Ok(ExecutionStatusResponse {
            success: execution.status == ExecutionStatus::Completed,
            status: execution.status,
            data,
            summary,
            error: execution.error_message,
        })
    }

    /// Access to the underlying DAL for direct queries.
    pub fn dal(&self) -> DAL {
        DAL::new(self.database.clone())
    }

    /// Stops the background reconciliation loop and waits for it.
    pub async fn shutdown(&self) {
        let mut handles = self.background.write().await;
        if let Some((handle, shutdown)) = handles.reconciliation.take() {
            let _ = shutdown.send(true);
            let _ = handle.await;
        }
        info!("analysis engine shut down");
    }

    /// Drives one created execution through invocation to a terminal state.
    async fn run_to_terminal(
        &self,
        execution_id: Uuid,
        kind: JobKind,
        args: Vec<String>,
        guard: upload::UploadGuard,
    ) -> Result<SubmissionResponse, SubmissionError> {
        // Guard held for the whole invocation; dropping it afterwards
        // cleans the input up on every path out of this function.
        let _guard = guard;

        let _slot = self
            .worker_slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SubmissionError::Internal(format!("worker slots closed: {}", e)))?;

        self.tracker.mark_running(execution_id).await?;

        let program = self.config.worker_for(kind).clone();
        let limits = self.config.limits_for(kind);
        let outcome = self.invoker.invoke(&program, &args, &limits).await;

        match outcome {
            InvocationOutcome::Success { stdout } => {
                self.settle_parsed_output(execution_id, &stdout).await
            }
            InvocationOutcome::Failure { kind, message, .. } => {
                warn!(execution_id = %execution_id, failure = %kind, "worker invocation failed");
                self.fail_and_respond(execution_id, message).await
            }
        }
    }

    /// Parses worker stdout and settles the execution accordingly.
    async fn settle_parsed_output(
        &self,
        execution_id: Uuid,
        stdout: &str,
    ) -> Result<SubmissionResponse, SubmissionError> {
        let document = match parse_worker_output(stdout) {
            Ok(document) => document,
            Err(e) => return self.fail_and_respond(execution_id, e.to_string()).await,
        };

        let summary = document
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let worker_succeeded = document
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if worker_succeeded {
            let message = if summary.is_empty() {
                "analysis complete".to_string()
            } else {
                summary.clone()
            };
            match self
                .tracker
                .complete(execution_id, document.clone(), &summary)
                .await
            {
                Ok(()) => Ok(SubmissionResponse::completed(execution_id, message, document)),
                Err(TrackerError::IllegalTransition { .. }) => {
                    self.settle_from_store(execution_id).await
                }
                Err(e) => Err(e.into()),
            }
        } else {
            // Worker-reported failure: keep the document for debugging,
            // but the execution and the envelope both say failed.
            let error = document
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("worker reported failure")
                .to_string();
            match self
                .tracker
                .fail_with_result(execution_id, document, &summary, &error)
                .await
            {
                Ok(()) => Ok(SubmissionResponse::failed(execution_id, error)),
                Err(TrackerError::IllegalTransition { .. }) => {
                    self.settle_from_store(execution_id).await
                }
                Err(e) => Err(e.into()),
            }
        }
    }

    /// Marks the execution failed and shapes the failure envelope. A lost
    /// race with another terminal writer settles from the stored row.
    async fn fail_and_respond(
        &self,
        execution_id: Uuid,
        message: String,
    ) -> Result<SubmissionResponse, SubmissionError> {
        match self.tracker.fail(execution_id, &message).await {
            Ok(()) => Ok(SubmissionResponse::failed(execution_id, message)),
            Err(TrackerError::IllegalTransition { .. }) => {
                self.settle_from_store(execution_id).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Shapes the envelope from the stored row after a terminal transition
    /// lost a race, typically with the reconciliation sweep. The row's
    /// state wins; the submitter still gets a definitive answer.
    async fn settle_from_store(
        &self,
        execution_id: Uuid,
    ) -> Result<SubmissionResponse, SubmissionError> {
        let execution = self
            .tracker
            .get(execution_id)
            .await?
            .ok_or(SubmissionError::NotFound(execution_id))?;
        if !execution.status.is_terminal() {
            return Err(SubmissionError::Internal(format!(
                "execution '{}' left non-terminal after a conflicting update",
                execution_id
            )));
        }
        warn!(execution_id = %execution_id, status = %execution.status, "terminal transition lost a race; settling from store");

        match execution.status {
            ExecutionStatus::Completed => {
                let result = self.tracker.get_result(execution_id).await?.ok_or_else(|| {
                    SubmissionError::Internal(format!(
                        "execution '{}' is completed but has no stored result",
                        execution_id
                    ))
                })?;
                let message = if result.summary.is_empty() {
                    "analysis complete".to_string()
                } else {
                    result.summary.clone()
                };
                Ok(SubmissionResponse::completed(
                    execution_id,
                    message,
                    result.document,
                ))
            }
            _ => Ok(SubmissionResponse::failed(
                execution_id,
                execution
                    .error_message
                    .unwrap_or_else(|| "execution failed".to_string()),
            )),
        }
    }

    /// Fails an execution whose input never reached the worker and shapes
    /// the failure envelope.
    async fn fail_before_invocation(
        &self,
        execution_id: Uuid,
        cause: SubmissionError,
    ) -> Result<SubmissionResponse, SubmissionError> {
        self.fail_and_respond(execution_id, cause.to_string()).await
    }
}

/// Builder for [`AnalysisEngine`].
///
/// # Example
/// ```rust,ignore
/// let engine = AnalysisEngine::builder()
///     .database_url("minerva.db")
///     .with_config(EngineConfig::builder().dataset_worker("workers/analyze.py").build())
///     .build()
///     .await?;
/// ```
pub struct AnalysisEngineBuilder {
    database_url: String,
    config: EngineConfig,
    invoker: Option<Arc<dyn WorkerInvoker>>,
}

impl AnalysisEngineBuilder {
    fn new() -> Self {
        Self {
            database_url: "minerva.db".to_string(),
            config: EngineConfig::default(),
            invoker: None,
        }
    }

    /// Sets the SQLite database location (file path, `sqlite://` URL, or
    /// `:memory:`). Defaults to `minerva.db` in the working directory.
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// Replaces the default configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Substitutes the worker invoker. Intended for tests that script
    /// worker behavior without spawning processes.
    pub fn with_invoker(mut self, invoker: Arc<dyn WorkerInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Connects to the store, applies migrations, and starts the
    /// background reconciliation loop when enabled.
    pub async fn build(self) -> Result<AnalysisEngine, StorageError> {
        let database = Database::new(&self.database_url, self.config.db_pool_size);
        database.run_migrations().await?;

        let tracker = ExecutionTracker::new(DAL::new(database.clone()));
        let invoker = self
            .invoker
            .unwrap_or_else(|| Arc::new(ProcessWorkerInvoker::new()));

        let reconciliation = if self.config.enable_reconciliation {
            let service = ReconciliationService::new(tracker.clone(), self.config.clone());
            Some(service.spawn())
        } else {
            None
        };

        info!(
            max_concurrent_workers = self.config.max_concurrent_workers,
            reconciliation = self.config.enable_reconciliation,
            "analysis engine started"
        );

        Ok(AnalysisEngine {
            worker_slots: Arc::new(Semaphore::new(self.config.max_concurrent_workers)),
            config: Arc::new(self.config),
            database,
            tracker,
            invoker,
            background: Arc::new(RwLock::new(BackgroundHandles { reconciliation })),
        })
    }
}
