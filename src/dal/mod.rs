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

//! Data Access Layer
//!
//! This module provides CRUD operations over the SQLite store. Row structs
//! use SQLite-compatible types (BLOB uuids, RFC3339 TEXT timestamps) and
//! are converted to domain types at the DAL boundary.

pub mod analysis_result;
pub mod execution;
pub mod models;

pub use analysis_result::AnalysisResultDAL;
pub use execution::ExecutionDAL;

use crate::database::Database;

/// Data access layer facade.
///
/// Cheap to clone; all clones share the same connection pool.
#[derive(Clone, Debug)]
pub struct DAL {
    pub(crate) database: Database,
}

impl DAL {
    /// Creates a new DAL instance backed by the given database.
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Data access for execution records.
    pub fn execution(&self) -> ExecutionDAL<'_> {
        ExecutionDAL::new(self)
    }

    /// Data access for stored worker results.
    pub fn analysis_result(&self) -> AnalysisResultDAL<'_> {
        AnalysisResultDAL::new(self)
    }
}
