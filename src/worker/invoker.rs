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

//! Worker invocation adapter.
//!
//! Spawns the external analysis program with a discrete argument vector,
//! captures stdout/stderr under byte caps, enforces a wall-clock timeout
//! with a forced kill, and reports exactly one tagged outcome per
//! invocation.
//!
//! Arguments are always passed through the process argv. Building a shell
//! command line from the inputs is incorrect: free-text fields and file
//! paths may contain quotes, newlines, or shell metacharacters and must
//! reach the worker byte-for-byte.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Resource limits for a single invocation.
#[derive(Debug, Clone)]
pub struct InvocationLimits {
    /// Wall-clock budget; the process is killed once it elapses.
    pub timeout: Duration,
    /// Stdout capture cap. Output beyond this is discarded and the
    /// invocation reports `StdoutTruncated` instead of success.
    pub max_stdout_bytes: usize,
    /// Stderr capture cap; excess stderr is silently dropped.
    pub max_stderr_bytes: usize,
}

/// Why an invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The process did not exit within the timeout and was killed.
    TimedOut,
    /// The process exited with a non-zero status.
    NonZeroExit,
    /// The process could not be started (e.g., executable not found).
    SpawnError,
    /// The process exited cleanly but its stdout exceeded the cap.
    StdoutTruncated,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::TimedOut => "timed_out",
            FailureKind::NonZeroExit => "non_zero_exit",
            FailureKind::SpawnError => "spawn_error",
            FailureKind::StdoutTruncated => "stdout_truncated",
        };
        f.write_str(s)
    }
}

/// The single terminal outcome of one worker invocation.
#[derive(Debug, Clone)]
pub enum InvocationOutcome {
    /// The process exited zero within budget and its stdout fit the cap.
    Success {
        /// Captured stdout, lossily decoded as UTF-8.
        stdout: String,
    },
    /// The process failed; `kind` says how.
    Failure {
        kind: FailureKind,
        /// Exit code when the process exited on its own.
        exit_code: Option<i32>,
        /// Captured stderr (capped), lossily decoded as UTF-8.
        stderr: String,
        /// Human-readable description for the execution's error message.
        message: String,
    },
}

impl InvocationOutcome {
    fn failure(kind: FailureKind, exit_code: Option<i32>, stderr: String, message: String) -> Self {
        InvocationOutcome::Failure {
            kind,
            exit_code,
            stderr,
            message,
        }
    }
}

/// Abstraction over the process-as-RPC call.
///
/// The orchestrator is written as straight-line sequential logic against
/// this trait; tests substitute a scripted implementation.
#[async_trait::async_trait]
pub trait WorkerInvoker: Send + Sync {
    /// Runs the program once with the given argv and limits.
    ///
    /// Exactly one outcome is produced per invocation; failures are data,
    /// not errors, so the caller always learns what happened.
    async fn invoke(
        &self,
        program: &Path,
        args: &[String],
        limits: &InvocationLimits,
    ) -> InvocationOutcome;
}

/// The production invoker: one spawned child process per call.
///
/// Holds no shared mutable state; concurrent invocations are independent.
#[derive(Debug, Default, Clone)]
pub struct ProcessWorkerInvoker;

impl ProcessWorkerInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl WorkerInvoker for ProcessWorkerInvoker {
    async fn invoke(
        &self,
        program: &Path,
        args: &[String],
        limits: &InvocationLimits,
    ) -> InvocationOutcome {
        debug!(program = %program.display(), args = args.len(), "spawning worker");

        let mut child = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %program.display(), error = %e, "worker spawn failed");
                return InvocationOutcome::failure(
                    FailureKind::SpawnError,
                    None,
                    String::new(),
                    format!("failed to start worker '{}': {}", program.display(), e),
                );
            }
        };

        // Drain both pipes concurrently with the wait. Reading must continue
        // past the cap, otherwise a chatty worker blocks on a full pipe and
        // the invocation only ever ends by timeout.
        let stdout_pipe = child.stdout.take().expect("stdout was piped");
        let stderr_pipe = child.stderr.take().expect("stderr was piped");
        let stdout_task = tokio::spawn(read_capped(stdout_pipe, limits.max_stdout_bytes));
        let stderr_task = tokio::spawn(read_capped(stderr_pipe, limits.max_stderr_bytes));

        let status = match tokio::time::timeout(limits.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                stdout_task.abort();
                stderr_task.abort();
                return InvocationOutcome::failure(
                    FailureKind::SpawnError,
                    None,
                    String::new(),
                    format!("failed to wait for worker: {}", e),
                );
            }
            Err(_) => {
                // Budget elapsed: kill, then reap so the pipes close and the
                // reader tasks reach EOF.
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill timed-out worker");
                }
                let stderr = join_capture(stderr_task).await.0;
                warn!(budget_secs = limits.timeout.as_secs_f64(), "worker timed out");
                return InvocationOutcome::failure(
                    FailureKind::TimedOut,
                    None,
                    stderr,
                    format!(
                        "worker timed out after {} seconds",
                        limits.timeout.as_secs_f64()
                    ),
                );
            }
        };

        let (stdout, stdout_truncated) = join_capture(stdout_task).await;
        let (stderr, _) = join_capture(stderr_task).await;

        if !status.success() {
            let exit_code = status.code();
            let detail = if stderr.trim().is_empty() {
                "no stderr output".to_string()
            } else {
                stderr.trim().to_string()
            };
            return InvocationOutcome::failure(
                FailureKind::NonZeroExit,
                exit_code,
                stderr,
                match exit_code {
                    Some(code) => format!("worker exited with code {}: {}", code, detail),
                    None => format!("worker killed by signal: {}", detail),
                },
            );
        }

        if stdout_truncated {
            warn!(cap = limits.max_stdout_bytes, "worker stdout truncated");
            return InvocationOutcome::failure(
                FailureKind::StdoutTruncated,
                status.code(),
                stderr,
                format!(
                    "worker stdout exceeded the {} byte limit",
                    limits.max_stdout_bytes
                ),
            );
        }

        InvocationOutcome::Success { stdout }
    }
}

/// Reads a stream to EOF, keeping at most `cap` bytes.
///
/// Returns the kept bytes (lossily decoded) and whether anything was
/// dropped.
async fn read_capped<R>(mut reader: R, cap: usize) -> (String, bool)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut kept = Vec::with_capacity(cap.min(64 * 1024));
    let mut truncated = false;
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let room = cap.saturating_sub(kept.len());
                if room >= n {
                    kept.extend_from_slice(&chunk[..n]);
                } else {
                    kept.extend_from_slice(&chunk[..room]);
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }

    (String::from_utf8_lossy(&kept).into_owned(), truncated)
}

async fn join_capture(task: tokio::task::JoinHandle<(String, bool)>) -> (String, bool) {
    task.await.unwrap_or_else(|_| (String::new(), false))
}
