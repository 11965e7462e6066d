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

//! Execution Model
//!
//! An `Execution` is the durable record of one user-submitted analysis job,
//! from acceptance through its terminal state. Status transitions are
//! monotonic and one-directional: `pending -> running -> completed | failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of worker an execution is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Single-file dataset analysis (statistics, clustering, anomalies).
    DatasetAnalysis,
    /// Batch resume scoring against a free-text job description.
    ResumeScreening,
}

impl JobKind {
    /// The string stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::DatasetAnalysis => "dataset_analysis",
            JobKind::ResumeScreening => "resume_screening",
        }
    }

    /// Parses a stored `kind` column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dataset_analysis" => Some(JobKind::DatasetAnalysis),
            "resume_screening" => Some(JobKind::ResumeScreening),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    /// The string stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }

    /// Parses a stored `status` column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ExecutionStatus::Pending),
            "running" => Some(ExecutionStatus::Running),
            "completed" => Some(ExecutionStatus::Completed),
            "failed" => Some(ExecutionStatus::Failed),
            _ => None,
        }
    }

    /// Whether this status is terminal. Terminal executions are never
    /// transitioned again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents an execution record in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    /// Unique identifier, generated before the worker is invoked.
    pub id: Uuid,
    /// The submitting user. Ownership checks compare against this.
    pub user_id: String,
    /// Which worker kind this execution is dispatched to.
    pub kind: JobKind,
    /// Human-readable input descriptor (original filename or a file count).
    pub input_descriptor: String,
    /// Current lifecycle status.
    pub status: ExecutionStatus,
    /// Populated only when `status` is `failed`; capped at 2000 characters.
    pub error_message: Option<String>,
    /// Timestamp when the execution record was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last status transition.
    pub updated_at: DateTime<Utc>,
    /// Timestamp of the terminal transition, if reached.
    pub completed_at: Option<DateTime<Utc>>,
}

/// The fields required to insert a new `pending` execution.
///
/// The id is supplied by the caller so that upload paths can be namespaced
/// per execution before the worker runs.
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub id: Uuid,
    pub user_id: String,
    pub kind: JobKind,
    pub input_descriptor: String,
}
