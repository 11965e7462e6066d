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

//! Execution DAL
//!
//! CRUD operations for execution records. Status transitions are enforced
//! here with status-guarded UPDATEs: a terminal row matches no guard, so the
//! update reports zero affected rows instead of silently re-opening the
//! execution. Callers map "zero rows" to a lifecycle error.

use super::DAL;
use crate::dal::models::{
    current_timestamp_string, datetime_to_string, uuid_to_blob, NewSqliteExecution,
    SqliteExecution,
};
use crate::database::schema::executions;
use crate::error::StorageError;
use crate::models::execution::{Execution, ExecutionStatus, JobKind, NewExecution};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Data access layer for execution records.
#[derive(Clone)]
pub struct ExecutionDAL<'a> {
    dal: &'a DAL,
}

impl<'a> ExecutionDAL<'a> {
    /// Creates a new ExecutionDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Inserts a new `pending` execution record.
    pub async fn create(&self, new_execution: NewExecution) -> Result<Execution, StorageError> {
        let conn = self.dal.database.get_connection().await?;

        let now = current_timestamp_string();
        let id_blob = uuid_to_blob(&new_execution.id);

        let sqlite_new = NewSqliteExecution {
            id: id_blob.clone(),
            user_id: new_execution.user_id,
            kind: new_execution.kind.as_str().to_string(),
            input_descriptor: new_execution.input_descriptor,
            status: ExecutionStatus::Pending.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now,
        };

        conn.interact(move |conn| {
            diesel::insert_into(executions::table)
                .values(&sqlite_new)
                .execute(conn)
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        // Retrieve the inserted record
        let execution: SqliteExecution = conn
            .interact(move |conn| executions::table.find(id_blob).first(conn))
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(execution.into())
    }

    /// Retrieves an execution by its unique identifier.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Execution>, StorageError> {
        let conn = self.dal.database.get_connection().await?;

        let id_blob = uuid_to_blob(&id);
        let execution: Option<SqliteExecution> = conn
            .interact(move |conn| executions::table.find(id_blob).first(conn).optional())
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(execution.map(Into::into))
    }

    /// Transitions `pending -> running`.
    ///
    /// Returns the number of affected rows. Re-applying to an execution
    /// already `running` touches the row again (idempotent); a terminal
    /// execution matches no guard and reports zero rows.
    pub async fn mark_running(&self, id: Uuid) -> Result<usize, StorageError> {
        let conn = self.dal.database.get_connection().await?;

        let id_blob = uuid_to_blob(&id);
        let now = current_timestamp_string();
        let rows = conn
            .interact(move |conn| {
                diesel::update(
                    executions::table.find(id_blob).filter(
                        executions::status.eq_any(vec![
                            ExecutionStatus::Pending.as_str(),
                            ExecutionStatus::Running.as_str(),
                        ]),
                    ),
                )
                .set((
                    executions::status.eq(ExecutionStatus::Running.as_str()),
                    executions::updated_at.eq(now),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(rows)
    }

    /// Marks an execution as completed and sets the completion timestamp.
    ///
    /// Only non-terminal executions match the guard; returns affected rows.
    pub async fn mark_completed(&self, id: Uuid) -> Result<usize, StorageError> {
        let conn = self.dal.database.get_connection().await?;

        let id_blob = uuid_to_blob(&id);
        let now = current_timestamp_string();
        let rows = conn
            .interact(move |conn| {
                diesel::update(
                    executions::table.find(id_blob).filter(
                        executions::status.eq_any(vec![
                            ExecutionStatus::Pending.as_str(),
                            ExecutionStatus::Running.as_str(),
                        ]),
                    ),
                )
                .set((
                    executions::status.eq(ExecutionStatus::Completed.as_str()),
                    executions::completed_at.eq(Some(now.clone())),
                    executions::updated_at.eq(now),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(rows)
    }

    /// Marks an execution as failed and records the failure reason.
    ///
    /// Only non-terminal executions match the guard; returns affected rows.
    pub async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<usize, StorageError> {
        let conn = self.dal.database.get_connection().await?;

        let id_blob = uuid_to_blob(&id);
        let reason = reason.to_string();
        let now = current_timestamp_string();
        let rows = conn
            .interact(move |conn| {
                diesel::update(
                    executions::table.find(id_blob).filter(
                        executions::status.eq_any(vec![
                            ExecutionStatus::Pending.as_str(),
                            ExecutionStatus::Running.as_str(),
                        ]),
                    ),
                )
                .set((
                    executions::status.eq(ExecutionStatus::Failed.as_str()),
                    executions::error_message.eq(reason),
                    executions::completed_at.eq(Some(now.clone())),
                    executions::updated_at.eq(now),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(rows)
    }

    /// Retrieves recent executions for a user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Execution>, StorageError> {
        let conn = self.dal.database.get_connection().await?;

        let user_id = user_id.to_string();
        let rows: Vec<SqliteExecution> = conn
            .interact(move |conn| {
                executions::table
                    .filter(executions::user_id.eq(user_id))
                    .order(executions::created_at.desc())
                    .limit(limit)
                    .load(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Retrieves `running` executions of a kind last touched before `cutoff`.
    ///
    /// RFC3339 strings with a fixed UTC offset compare lexicographically,
    /// so the cutoff comparison happens in SQL.
    pub async fn get_stale_running(
        &self,
        kind: JobKind,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Execution>, StorageError> {
        let conn = self.dal.database.get_connection().await?;

        let cutoff = datetime_to_string(&cutoff);
        let rows: Vec<SqliteExecution> = conn
            .interact(move |conn| {
                executions::table
                    .filter(executions::status.eq(ExecutionStatus::Running.as_str()))
                    .filter(executions::kind.eq(kind.as_str()))
                    .filter(executions::updated_at.lt(cutoff))
                    .load(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
