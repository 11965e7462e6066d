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

//! Engine configuration.
//!
//! All operational knobs for the analysis engine live here: worker
//! program paths, per-kind timeouts, upload limits, concurrency caps, and
//! the reconciliation sweep schedule. Defaults are tuned for a small
//! single-host deployment; override through [`EngineConfig::builder`].

use std::path::PathBuf;
use std::time::Duration;

use crate::models::JobKind;
use crate::worker::InvocationLimits;

/// Configuration for the analysis engine.
///
/// This struct defines the parameters that control submission validation,
/// worker invocation, concurrency, and background reconciliation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of database connections to maintain in the connection pool.
    /// SQLite deployments are clamped to a single writer internally.
    pub db_pool_size: u32,

    /// Directory under which submitted inputs are materialized. Dataset
    /// files land directly in this directory; resume batches each get a
    /// subdirectory named by execution id.
    pub upload_root: PathBuf,

    /// Maximum number of worker processes running at any given time.
    /// Submissions beyond this cap wait for a slot rather than failing.
    pub max_concurrent_workers: usize,

    /// Path to the dataset analysis worker program.
    pub dataset_worker: PathBuf,

    /// Path to the resume screening worker program.
    pub resume_worker: PathBuf,

    /// Maximum wall-clock time allowed for a dataset analysis worker.
    pub dataset_timeout: Duration,

    /// Maximum wall-clock time allowed for a resume screening worker.
    /// Screening reads every file in a batch, so its budget is larger.
    pub resume_timeout: Duration,

    /// Cap on captured worker stdout, in bytes. Output past the cap is
    /// drained and discarded; a truncated payload fails the execution.
    pub max_stdout_bytes: usize,

    /// Cap on captured worker stderr, in bytes.
    pub max_stderr_bytes: usize,

    /// Maximum size of a single uploaded file, in bytes.
    pub max_file_bytes: usize,

    /// Maximum number of files accepted in one resume screening batch.
    pub max_resume_files: usize,

    /// Minimum length of a resume screening job description, in characters.
    pub min_description_chars: usize,

    /// How long a resume batch directory is kept on disk after its
    /// execution reaches a terminal state.
    pub resume_dir_retention: Duration,

    /// Whether to run the background sweep that fails executions left
    /// `running` by a crashed host process.
    pub enable_reconciliation: bool,

    /// How often the reconciliation sweep runs.
    pub reconciliation_interval: Duration,

    /// A `running` execution is considered abandoned once its age exceeds
    /// this multiple of its kind's timeout.
    pub stale_multiplier: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_pool_size: 10,
            upload_root: PathBuf::from("./uploads"),
            max_concurrent_workers: 4,
            dataset_worker: PathBuf::from("./workers/dataset_analysis"),
            resume_worker: PathBuf::from("./workers/resume_screening"),
            dataset_timeout: Duration::from_secs(300), // 5 minutes
            resume_timeout: Duration::from_secs(900),  // 15 minutes
            max_stdout_bytes: 4 * 1024 * 1024,
            max_stderr_bytes: 64 * 1024,
            max_file_bytes: 10 * 1024 * 1024,
            max_resume_files: 10,
            min_description_chars: 10,
            resume_dir_retention: Duration::from_secs(3600),
            enable_reconciliation: true,
            reconciliation_interval: Duration::from_secs(300),
            stale_multiplier: 3,
        }
    }
}

impl EngineConfig {
    /// Creates a builder seeded with the defaults.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The wall-clock budget for one worker of the given kind.
    pub fn timeout_for(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::DatasetAnalysis => self.dataset_timeout,
            JobKind::ResumeScreening => self.resume_timeout,
        }
    }

    /// The worker program path for the given kind.
    pub fn worker_for(&self, kind: JobKind) -> &PathBuf {
        match kind {
            JobKind::DatasetAnalysis => &self.dataset_worker,
            JobKind::ResumeScreening => &self.resume_worker,
        }
    }

    /// Invocation limits for one worker of the given kind.
    pub fn limits_for(&self, kind: JobKind) -> InvocationLimits {
        InvocationLimits {
            timeout: self.timeout_for(kind),
            max_stdout_bytes: self.max_stdout_bytes,
            max_stderr_bytes: self.max_stderr_bytes,
        }
    }

    /// Age past which a `running` execution of the given kind is treated
    /// as abandoned by the reconciliation sweep.
    pub fn stale_after(&self, kind: JobKind) -> Duration {
        self.timeout_for(kind) * self.stale_multiplier
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Sets the database connection pool size.
    pub fn db_pool_size(mut self, size: u32) -> Self {
        self.config.db_pool_size = size;
        self
    }

    /// Sets the directory where submitted inputs are stored.
    pub fn upload_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.upload_root = root.into();
        self
    }

    /// Sets the maximum number of concurrently running workers.
    pub fn max_concurrent_workers(mut self, max: usize) -> Self {
        self.config.max_concurrent_workers = max;
        self
    }

    /// Sets the dataset analysis worker program path.
    pub fn dataset_worker(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.dataset_worker = program.into();
        self
    }

    /// Sets the resume screening worker program path.
    pub fn resume_worker(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.resume_worker = program.into();
        self
    }

    /// Sets the dataset worker wall-clock budget.
    pub fn dataset_timeout(mut self, timeout: Duration) -> Self {
        self.config.dataset_timeout = timeout;
        self
    }

    /// Sets the resume worker wall-clock budget.
    pub fn resume_timeout(mut self, timeout: Duration) -> Self {
        self.config.resume_timeout = timeout;
        self
    }

    /// Sets the captured-stdout cap in bytes.
    pub fn max_stdout_bytes(mut self, bytes: usize) -> Self {
        self.config.max_stdout_bytes = bytes;
        self
    }

    /// Sets the captured-stderr cap in bytes.
    pub fn max_stderr_bytes(mut self, bytes: usize) -> Self {
        self.config.max_stderr_bytes = bytes;
        self
    }

    /// Sets the maximum size of a single uploaded file in bytes.
    pub fn max_file_bytes(mut self, bytes: usize) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    /// Sets the maximum number of files in a resume screening batch.
    pub fn max_resume_files(mut self, max: usize) -> Self {
        self.config.max_resume_files = max;
        self
    }

    /// Sets the minimum job description length in characters.
    pub fn min_description_chars(mut self, min: usize) -> Self {
        self.config.min_description_chars = min;
        self
    }

    /// Sets how long a resume batch directory outlives its execution.
    pub fn resume_dir_retention(mut self, retention: Duration) -> Self {
        self.config.resume_dir_retention = retention;
        self
    }

    /// Enables or disables the background reconciliation sweep.
    pub fn enable_reconciliation(mut self, enabled: bool) -> Self {
        self.config.enable_reconciliation = enabled;
        self
    }

    /// Sets the reconciliation sweep interval.
    pub fn reconciliation_interval(mut self, interval: Duration) -> Self {
        self.config.reconciliation_interval = interval;
        self
    }

    /// Sets the staleness multiplier applied to per-kind timeouts.
    pub fn stale_multiplier(mut self, multiplier: u32) -> Self {
        self.config.stale_multiplier = multiplier;
        self
    }

    /// Finalizes the configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
