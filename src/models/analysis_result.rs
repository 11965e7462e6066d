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

//! Analysis Result Model
//!
//! An `AnalysisResult` is the persisted worker document for exactly one
//! execution. Result rows are written once and never mutated; at most one
//! exists per execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::worker::ResultDocument;

/// Represents a stored worker result.
///
/// The document has no fixed schema beyond being a JSON object; worker
/// output is additive across versions and passes through the core
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Unique identifier for the result row.
    pub id: Uuid,
    /// The execution this result belongs to.
    pub execution_id: Uuid,
    /// The parsed worker document, exactly as emitted.
    pub document: ResultDocument,
    /// Short human-readable summary extracted from the document.
    pub summary: String,
    /// Timestamp when the result row was created.
    pub created_at: DateTime<Utc>,
}

/// The fields required to insert a new result row.
#[derive(Debug, Clone)]
pub struct NewAnalysisResult {
    pub execution_id: Uuid,
    pub document: ResultDocument,
    pub summary: String,
}
