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

//! # Minerva
//!
//! A Rust library for asynchronous analysis job execution and result tracking.
//!
//! Minerva accepts a validated file submission, records an execution row in a
//! relational store, hands the stored input to an external single-shot worker
//! process, captures the worker's output under bounded buffers and a wall-clock
//! timeout, parses the emitted JSON document, and persists the result keyed by
//! an execution id for later retrieval.
//!
//! ## Architecture
//!
//! - [`engine::AnalysisEngine`] — the submission orchestrator and public
//!   entry point. Validates uploads, drives the execution lifecycle, and
//!   shapes response envelopes.
//! - [`worker`] — the invocation adapter ([`worker::ProcessWorkerInvoker`])
//!   that spawns workers with a discrete argument vector, plus the output
//!   parser for the worker's stdout document.
//! - [`tracker::ExecutionTracker`] — the per-execution state machine
//!   (`pending -> running -> completed | failed`) over the data access layer.
//! - [`dal`] / [`database`] — SQLite storage via Diesel with an async
//!   connection pool and embedded migrations.
//! - [`recovery::ReconciliationService`] — background sweep that fails
//!   executions left `running` by a crashed host process.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use minerva::{AnalysisEngine, EngineConfig, UploadedFile};
//!
//! let engine = AnalysisEngine::builder()
//!     .database_url("minerva.db")
//!     .with_config(
//!         EngineConfig::builder()
//!             .dataset_worker("ai_workers/data_analyst_bot.py")
//!             .resume_worker("ai_workers/resume_screener_bot.py")
//!             .build(),
//!     )
//!     .build()
//!     .await?;
//!
//! let upload = UploadedFile::new("sales.csv", csv_bytes);
//! let response = engine.submit_dataset_analysis("user-42", upload).await?;
//! let status = engine
//!     .get_execution("user-42", response.execution_id.unwrap())
//!     .await?;
//! ```
//!
//! ## External Worker Contract
//!
//! A worker is an opaque executable invoked once per execution. It receives
//! positional arguments (input path, optional free-text parameters, and the
//! execution id), emits exactly one JSON object on stdout, and signals
//! infrastructure failure through its exit code. Minerva never inspects the
//! document beyond the `success` and `summary` fields; worker schemas are
//! additive and pass through the core untouched.

pub mod config;
pub mod dal;
pub mod database;
pub mod engine;
pub mod error;
pub mod models;
pub mod recovery;
pub mod tracker;
pub mod worker;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use dal::DAL;
pub use database::Database;
pub use engine::{
    AnalysisEngine, AnalysisEngineBuilder, ExecutionStatusResponse, SubmissionResponse,
    UploadedFile,
};
pub use error::{StorageError, SubmissionError, TrackerError};
pub use models::{AnalysisResult, Execution, ExecutionStatus, JobKind};
pub use tracker::ExecutionTracker;
pub use worker::{
    FailureKind, InvocationLimits, InvocationOutcome, OutputParseError, ProcessWorkerInvoker,
    ResultDocument, WorkerInvoker,
};
