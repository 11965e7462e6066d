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

//! Upload materialization.
//!
//! Submitted bytes are written under the configured upload root with
//! paths derived only from the execution id and a validated extension;
//! client-supplied filenames never become path components. Inputs are
//! transient: a dataset file is removed as soon as its invocation ends on
//! any path, and a resume batch directory is removed after a retention
//! grace period so a worker's own late file reads do not race the
//! cleanup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::validation::UploadedFile;
use crate::error::SubmissionError;

/// A materialized input with scope-bound cleanup.
///
/// Dropping the guard without [`UploadGuard::disarm`] schedules removal of
/// the path, so every exit from the submission flow cleans up.
#[derive(Debug)]
pub struct UploadGuard {
    path: PathBuf,
    is_dir: bool,
    delay: Option<Duration>,
    armed: bool,
}

impl UploadGuard {
    fn new(path: PathBuf, is_dir: bool, delay: Option<Duration>) -> Self {
        Self {
            path,
            is_dir,
            delay,
            armed: true,
        }
    }

    /// The materialized path handed to the worker.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leaves the input on disk when the guard drops.
    #[cfg(test)]
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let path = self.path.clone();
        let is_dir = self.is_dir;
        let delay = self.delay;
        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let result = if is_dir {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };
            match result {
                Ok(()) => debug!(path = %path.display(), "removed upload"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "upload cleanup failed"),
            }
        });
    }
}

/// Writes a dataset file to `<upload_root>/<execution_id>.<ext>`.
pub async fn store_dataset_file(
    upload_root: &Path,
    execution_id: Uuid,
    file: &UploadedFile,
) -> Result<UploadGuard, SubmissionError> {
    let extension = file
        .extension()
        .ok_or_else(|| SubmissionError::Validation("file has no extension".to_string()))?;

    fs::create_dir_all(upload_root)
        .await
        .map_err(|e| store_error(upload_root, e))?;

    // Guard before write: a partially-written file from a failed write is
    // cleaned up when the guard drops on the error path.
    let path = upload_root.join(format!("{}.{}", execution_id, extension));
    let guard = UploadGuard::new(path.clone(), false, None);
    fs::write(&path, &file.bytes)
        .await
        .map_err(|e| store_error(&path, e))?;

    debug!(path = %path.display(), bytes = file.bytes.len(), "stored dataset file");
    Ok(guard)
}

/// Writes a resume batch to `<upload_root>/<execution_id>/resume_<n>.<ext>`.
///
/// The directory outlives the invocation by `retention` once the guard
/// drops.
pub async fn store_resume_batch(
    upload_root: &Path,
    execution_id: Uuid,
    files: &[UploadedFile],
    retention: Duration,
) -> Result<UploadGuard, SubmissionError> {
    let dir = upload_root.join(execution_id.to_string());
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| store_error(&dir, e))?;
    let guard = UploadGuard::new(dir.clone(), true, Some(retention));

    for (index, file) in files.iter().enumerate() {
        let extension = file
            .extension()
            .ok_or_else(|| SubmissionError::Validation("file has no extension".to_string()))?;
        let path = dir.join(format!("resume_{}.{}", index + 1, extension));
        fs::write(&path, &file.bytes)
            .await
            .map_err(|e| store_error(&path, e))?;
    }

    debug!(dir = %dir.display(), files = files.len(), "stored resume batch");
    Ok(guard)
}

fn store_error(path: &Path, e: std::io::Error) -> SubmissionError {
    SubmissionError::Internal(format!("failed to store upload at '{}': {}", path.display(), e))
}
