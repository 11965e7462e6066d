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

//! Analysis Result DAL
//!
//! Insert-once storage for worker result documents. The document is
//! serialized to TEXT on insert and parsed back at the DAL boundary; the
//! stored bytes are never rewritten.

use super::DAL;
use crate::dal::models::{
    current_timestamp_string, uuid_to_blob, NewSqliteAnalysisResult, SqliteAnalysisResult,
};
use crate::database::schema::analysis_results;
use crate::error::StorageError;
use crate::models::analysis_result::{AnalysisResult, NewAnalysisResult};
use diesel::prelude::*;
use uuid::Uuid;

/// Data access layer for stored worker results.
#[derive(Clone)]
pub struct AnalysisResultDAL<'a> {
    dal: &'a DAL,
}

impl<'a> AnalysisResultDAL<'a> {
    /// Creates a new AnalysisResultDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Inserts a new result row for an execution.
    ///
    /// The `UNIQUE` constraint on `execution_id` rejects a second result
    /// for the same execution at the database level.
    pub async fn create(
        &self,
        new_result: NewAnalysisResult,
    ) -> Result<AnalysisResult, StorageError> {
        let conn = self.dal.database.get_connection().await?;

        let id = Uuid::new_v4();
        let id_blob = uuid_to_blob(&id);
        let document = serde_json::to_string(&new_result.document)?;

        let sqlite_new = NewSqliteAnalysisResult {
            id: id_blob.clone(),
            execution_id: uuid_to_blob(&new_result.execution_id),
            document,
            summary: new_result.summary,
            created_at: current_timestamp_string(),
        };

        conn.interact(move |conn| {
            diesel::insert_into(analysis_results::table)
                .values(&sqlite_new)
                .execute(conn)
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        let result: SqliteAnalysisResult = conn
            .interact(move |conn| analysis_results::table.find(id_blob).first(conn))
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(result.into())
    }

    /// Retrieves the result for an execution, if one was stored.
    pub async fn get_by_execution(
        &self,
        execution_id: Uuid,
    ) -> Result<Option<AnalysisResult>, StorageError> {
        let conn = self.dal.database.get_connection().await?;

        let execution_blob = uuid_to_blob(&execution_id);
        let result: Option<SqliteAnalysisResult> = conn
            .interact(move |conn| {
                analysis_results::table
                    .filter(analysis_results::execution_id.eq(execution_blob))
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(result.map(Into::into))
    }
}
