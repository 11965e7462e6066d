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

//! SQLite row models
//!
//! Diesel model definitions using SQLite-compatible types: UUIDs as BLOB
//! (`Vec<u8>`), timestamps as RFC3339 TEXT. These are internal to the DAL
//! and converted to/from domain types at its boundary.

use crate::database::schema::*;
use diesel::prelude::*;

// ============================================================================
// Execution Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = executions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SqliteExecution {
    pub id: Vec<u8>,
    pub user_id: String,
    pub kind: String,
    pub input_descriptor: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = executions)]
pub struct NewSqliteExecution {
    pub id: Vec<u8>,
    pub user_id: String,
    pub kind: String,
    pub input_descriptor: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// Analysis Result Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = analysis_results)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SqliteAnalysisResult {
    pub id: Vec<u8>,
    pub execution_id: Vec<u8>,
    pub document: String,
    pub summary: String,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = analysis_results)]
pub struct NewSqliteAnalysisResult {
    pub id: Vec<u8>,
    pub execution_id: Vec<u8>,
    pub document: String,
    pub summary: String,
    pub created_at: String,
}

// ============================================================================
// Conversion Utilities
// ============================================================================

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Convert a UUID to SQLite BLOB format (Vec<u8>)
pub fn uuid_to_blob(uuid: &Uuid) -> Vec<u8> {
    uuid.as_bytes().to_vec()
}

/// Convert SQLite BLOB to UUID
pub fn blob_to_uuid(blob: &[u8]) -> Result<Uuid, uuid::Error> {
    Uuid::from_slice(blob)
}

/// Convert DateTime<Utc> to RFC3339 string for SQLite storage
pub fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse RFC3339 string from SQLite to DateTime<Utc>
pub fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Current timestamp as RFC3339 string
pub fn current_timestamp_string() -> String {
    Utc::now().to_rfc3339()
}

// ============================================================================
// Conversion Implementations: SQLite models <-> Domain models
// ============================================================================

use crate::models::analysis_result::AnalysisResult;
use crate::models::execution::{Execution, ExecutionStatus, JobKind};

impl From<SqliteExecution> for Execution {
    fn from(s: SqliteExecution) -> Self {
        Execution {
            id: blob_to_uuid(&s.id).expect("Invalid UUID in database"),
            user_id: s.user_id,
            kind: JobKind::parse(&s.kind).expect("Invalid job kind in database"),
            input_descriptor: s.input_descriptor,
            status: ExecutionStatus::parse(&s.status).expect("Invalid status in database"),
            error_message: s.error_message,
            created_at: string_to_datetime(&s.created_at).expect("Invalid timestamp in database"),
            updated_at: string_to_datetime(&s.updated_at).expect("Invalid timestamp in database"),
            completed_at: s
                .completed_at
                .map(|ts| string_to_datetime(&ts).expect("Invalid timestamp in database")),
        }
    }
}

impl From<SqliteAnalysisResult> for AnalysisResult {
    fn from(s: SqliteAnalysisResult) -> Self {
        AnalysisResult {
            id: blob_to_uuid(&s.id).expect("Invalid UUID in database"),
            execution_id: blob_to_uuid(&s.execution_id).expect("Invalid UUID in database"),
            document: serde_json::from_str(&s.document).expect("Invalid document in database"),
            summary: s.summary,
            created_at: string_to_datetime(&s.created_at).expect("Invalid timestamp in database"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_blob_round_trip() {
        let id = Uuid::new_v4();
        assert_eq!(blob_to_uuid(&uuid_to_blob(&id)).unwrap(), id);
    }

    #[test]
    fn test_blob_to_uuid_rejects_bad_length() {
        assert!(blob_to_uuid(&[0u8; 3]).is_err());
    }

    #[test]
    fn test_datetime_string_round_trip() {
        let now = Utc::now();
        let parsed = string_to_datetime(&datetime_to_string(&now)).unwrap();
        assert_eq!(parsed, now);
    }
}
