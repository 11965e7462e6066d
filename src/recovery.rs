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

//! Abandoned-execution reconciliation.
//!
//! A host crash between `mark_running` and the terminal transition leaves
//! an execution stuck in `running` forever; no worker is attached to it
//! after restart. The [`ReconciliationService`] periodically sweeps for
//! `running` rows older than a multiple of their kind's timeout and fails
//! them with a descriptive message.
//!
//! The sweep is conservative: the staleness cutoff is several times the
//! worker budget, so a slow-but-live worker is never reaped while its
//! invocation task still holds the row.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::models::JobKind;
use crate::tracker::ExecutionTracker;

/// Background sweep that fails executions abandoned by a crashed process.
#[derive(Clone)]
pub struct ReconciliationService {
    tracker: ExecutionTracker,
    config: EngineConfig,
}

impl ReconciliationService {
    /// Creates a new reconciliation service.
    pub fn new(tracker: ExecutionTracker, config: EngineConfig) -> Self {
        Self { tracker, config }
    }

    /// Runs one sweep against the current wall clock.
    ///
    /// Returns the number of executions failed. Errors on individual rows
    /// are logged and skipped so one bad row cannot stall the sweep.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    /// Runs one sweep as-of the given instant. Split out for tests.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut reaped = 0;
        for kind in [JobKind::DatasetAnalysis, JobKind::ResumeScreening] {
            let stale_after = self.config.stale_after(kind);
            let cutoff = match ChronoDuration::from_std(stale_after)
                .ok()
                .and_then(|d| now.checked_sub_signed(d))
            {
                Some(cutoff) => cutoff,
                // Cutoff out of range means nothing can be stale
                None => continue,
            };

            let stale = match self.tracker.dal().execution().get_stale_running(kind, cutoff).await {
                Ok(rows) => rows,
                Err(e) => {
                    error!(kind = %kind, error = %e, "stale execution query failed");
                    continue;
                }
            };

            for execution in stale {
                let message = format!(
                    "execution abandoned: still running {} seconds after submission",
                    (now - execution.updated_at).num_seconds()
                );
                match self.tracker.fail(execution.id, &message).await {
                    Ok(()) => {
                        warn!(execution_id = %execution.id, kind = %kind, "reconciled abandoned execution");
                        reaped += 1;
                    }
                    // Lost the race with a live completion; nothing to do.
                    Err(e) => debug!(execution_id = %execution.id, error = %e, "skipping reconciliation"),
                }
            }
        }
        reaped
    }

    /// Spawns the periodic sweep loop.
    ///
    /// The loop runs until the returned sender is dropped or signalled.
    pub fn spawn(self) -> (JoinHandle<()>, watch::Sender<bool>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = self.config.reconciliation_interval;
        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "reconciliation service started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let reaped = self.sweep().await;
                        if reaped > 0 {
                            info!(reaped, "reconciliation sweep failed abandoned executions");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("reconciliation service stopping");
                            break;
                        }
                    }
                }
            }
        });
        (handle, shutdown_tx)
    }
}
