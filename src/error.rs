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

//! Error types shared across the crate.
//!
//! Storage, lifecycle, and submission errors live here; the worker module
//! defines its own invocation and output-parse errors next to the code that
//! produces them.

use thiserror::Error;
use uuid::Uuid;

use crate::models::ExecutionStatus;

/// Errors raised by the data access layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to obtain or use a pooled connection.
    #[error("Connection pool error: {0}")]
    ConnectionPool(String),

    /// A query failed.
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// A migration could not be applied.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored document could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the execution lifecycle tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Underlying storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No execution exists with the given id.
    #[error("Execution '{0}' not found")]
    ExecutionNotFound(Uuid),

    /// A transition was requested that the state machine forbids
    /// (e.g., re-opening a terminal execution).
    #[error("Illegal transition to '{to}' for execution '{id}'")]
    IllegalTransition { id: Uuid, to: ExecutionStatus },

    /// The result row was written but the status flip to `completed`
    /// could not be persisted even after a retry. The execution is left
    /// non-terminal; callers must not report success.
    #[error("Execution '{id}' has a stored result but its status update failed: {reason}")]
    CompletionInconsistency { id: Uuid, reason: String },
}

/// Errors surfaced to submission and retrieval callers.
///
/// Worker timeouts, crashes, and malformed output are *not* submission
/// errors — they terminate the execution as `failed` and still produce a
/// response envelope carrying the execution id.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The request failed structural validation; no execution was created.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested execution does not exist.
    #[error("Execution '{0}' not found")]
    NotFound(Uuid),

    /// The caller does not own the requested execution.
    #[error("Execution '{0}' belongs to a different user")]
    Forbidden(Uuid),

    /// Infrastructure failure (store unreachable, disk write failed).
    /// The execution may not have reached a terminal state.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for SubmissionError {
    fn from(e: StorageError) -> Self {
        SubmissionError::Internal(e.to_string())
    }
}

impl From<TrackerError> for SubmissionError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::ExecutionNotFound(id) => SubmissionError::NotFound(id),
            other => SubmissionError::Internal(other.to_string()),
        }
    }
}
