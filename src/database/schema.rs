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

//! Diesel schema definitions.
//!
//! UUIDs are stored as BLOB and timestamps as RFC3339 TEXT, matching the
//! SQLite model conventions used throughout the DAL.

diesel::table! {
    executions (id) {
        id -> Binary,
        user_id -> Text,
        kind -> Text,
        input_descriptor -> Text,
        status -> Text,
        error_message -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
        completed_at -> Nullable<Text>,
    }
}

diesel::table! {
    analysis_results (id) {
        id -> Binary,
        execution_id -> Binary,
        document -> Text,
        summary -> Text,
        created_at -> Text,
    }
}

diesel::joinable!(analysis_results -> executions (execution_id));
diesel::allow_tables_to_appear_in_same_query!(analysis_results, executions);
