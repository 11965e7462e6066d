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

//! Response envelopes.
//!
//! The shapes an HTTP layer serializes directly. `data` on success is the
//! worker's document verbatim: fields present in any successfully-parsed
//! document are never removed or renamed by this crate, only passed
//! through.

use serde::Serialize;
use uuid::Uuid;

use crate::models::ExecutionStatus;
use crate::worker::ResultDocument;

/// Envelope returned by both submission operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    /// Whether the execution completed successfully.
    pub success: bool,

    /// The execution id, present whenever an execution record was created.
    /// Absent only when validation rejected the request outright.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,

    /// Short human-readable status line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Failure description, populated only when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The worker's document, unmodified, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResultDocument>,
}

impl SubmissionResponse {
    /// Builds the success envelope carrying the worker's document.
    pub fn completed(execution_id: Uuid, message: impl Into<String>, data: ResultDocument) -> Self {
        Self {
            success: true,
            execution_id: Some(execution_id),
            message: Some(message.into()),
            error: None,
            data: Some(data),
        }
    }

    /// Builds the failure envelope for an execution that was created but
    /// did not complete.
    pub fn failed(execution_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            success: false,
            execution_id: Some(execution_id),
            message: None,
            error: Some(error.into()),
            data: None,
        }
    }
}

/// Envelope returned by the retrieval operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatusResponse {
    /// Whether the execution completed successfully.
    pub success: bool,

    /// Current lifecycle status.
    pub status: ExecutionStatus,

    /// The stored worker document, if a result exists.
    pub data: Option<ResultDocument>,

    /// The stored human summary, if a result exists.
    pub summary: Option<String>,

    /// The stored error message for failed executions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
