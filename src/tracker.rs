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

//! Execution lifecycle tracker.
//!
//! Owns the state machine for one execution: `pending -> running ->
//! completed | failed`. The DAL's status-guarded updates enforce that a
//! terminal execution is never re-opened; this module maps zero-row
//! updates to lifecycle errors and keeps the result-write and status-flip
//! of `complete` a single logical unit.

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dal::DAL;
use crate::error::TrackerError;
use crate::models::{
    AnalysisResult, Execution, ExecutionStatus, JobKind, NewAnalysisResult, NewExecution,
};
use crate::worker::ResultDocument;

/// Maximum stored error-message length, in characters.
const MAX_ERROR_MESSAGE_CHARS: usize = 2000;

/// Tracks the lifecycle of executions against the store.
///
/// Cheap to clone; all clones share the same connection pool.
#[derive(Clone, Debug)]
pub struct ExecutionTracker {
    dal: DAL,
}

impl ExecutionTracker {
    /// Creates a new tracker over the given DAL.
    pub fn new(dal: DAL) -> Self {
        Self { dal }
    }

    /// Access to the underlying DAL for direct queries.
    pub fn dal(&self) -> &DAL {
        &self.dal
    }

    /// Inserts a `pending` execution record.
    ///
    /// The id is supplied by the caller and must be fresh; it is generated
    /// before any upload is stored so input paths can be namespaced by it.
    /// This insert happens-before the worker is invoked: a host crash
    /// during invocation still leaves a discoverable record.
    pub async fn create(
        &self,
        id: Uuid,
        user_id: &str,
        kind: JobKind,
        input_descriptor: &str,
    ) -> Result<Execution, TrackerError> {
        let execution = self
            .dal
            .execution()
            .create(NewExecution {
                id,
                user_id: user_id.to_string(),
                kind,
                input_descriptor: input_descriptor.to_string(),
            })
            .await?;
        info!(execution_id = %id, kind = %kind, "execution created");
        Ok(execution)
    }

    /// Transitions `pending -> running`. Idempotent when already running.
    pub async fn mark_running(&self, id: Uuid) -> Result<(), TrackerError> {
        let rows = self.dal.execution().mark_running(id).await?;
        if rows == 0 {
            return Err(self.transition_error(id, ExecutionStatus::Running).await);
        }
        info!(execution_id = %id, "execution running");
        Ok(())
    }

    /// Persists the worker's result document and transitions to `completed`.
    ///
    /// The two writes are one logical unit: if the result insert succeeds
    /// but the status flip fails, the flip is retried once before the
    /// inconsistency is surfaced. Success is never reported while the
    /// execution is non-terminal.
    pub async fn complete(
        &self,
        id: Uuid,
        document: ResultDocument,
        summary: &str,
    ) -> Result<(), TrackerError> {
        self.dal
            .analysis_result()
            .create(NewAnalysisResult {
                execution_id: id,
                document,
                summary: summary.to_string(),
            })
            .await?;

        match self.dal.execution().mark_completed(id).await {
            Ok(rows) if rows > 0 => {
                info!(execution_id = %id, "execution completed");
                Ok(())
            }
            Ok(_) => Err(self.transition_error(id, ExecutionStatus::Completed).await),
            Err(first) => {
                warn!(execution_id = %id, error = %first, "status update failed; retrying");
                match self.dal.execution().mark_completed(id).await {
                    Ok(rows) if rows > 0 => {
                        info!(execution_id = %id, "execution completed after retry");
                        Ok(())
                    }
                    Ok(_) => Err(self.transition_error(id, ExecutionStatus::Completed).await),
                    Err(second) => {
                        error!(execution_id = %id, error = %second, "result stored but status update failed");
                        Err(TrackerError::CompletionInconsistency {
                            id,
                            reason: second.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Transitions to `failed`, storing a truncated error message.
    pub async fn fail(&self, id: Uuid, error_message: &str) -> Result<(), TrackerError> {
        let message = truncate_chars(error_message, MAX_ERROR_MESSAGE_CHARS);
        let rows = self.dal.execution().mark_failed(id, &message).await?;
        if rows == 0 {
            return Err(self.transition_error(id, ExecutionStatus::Failed).await);
        }
        info!(execution_id = %id, "execution failed: {}", message);
        Ok(())
    }

    /// Stores the worker's document for a semantically-failed run, then
    /// transitions to `failed`.
    ///
    /// The execution's status reflects the failure; the stored document is
    /// kept for debuggability.
    pub async fn fail_with_result(
        &self,
        id: Uuid,
        document: ResultDocument,
        summary: &str,
        error_message: &str,
    ) -> Result<(), TrackerError> {
        self.dal
            .analysis_result()
            .create(NewAnalysisResult {
                execution_id: id,
                document,
                summary: summary.to_string(),
            })
            .await?;
        self.fail(id, error_message).await
    }

    /// Read accessor for one execution. Exposes the owner id so callers can
    /// enforce ownership.
    pub async fn get(&self, id: Uuid) -> Result<Option<Execution>, TrackerError> {
        Ok(self.dal.execution().get_by_id(id).await?)
    }

    /// Read accessor for the stored result of one execution.
    pub async fn get_result(&self, id: Uuid) -> Result<Option<AnalysisResult>, TrackerError> {
        Ok(self.dal.analysis_result().get_by_execution(id).await?)
    }

    /// Builds the right error for a zero-row transition: the execution is
    /// either missing or already terminal.
    async fn transition_error(&self, id: Uuid, to: ExecutionStatus) -> TrackerError {
        match self.dal.execution().get_by_id(id).await {
            Ok(Some(_)) => TrackerError::IllegalTransition { id, to },
            Ok(None) => TrackerError::ExecutionNotFound(id),
            Err(e) => TrackerError::Storage(e),
        }
    }
}

/// Truncates on a char boundary.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
