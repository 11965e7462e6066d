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

//! Helpers for scripting stub worker executables.
//!
//! Each helper writes a small `/bin/sh` script into the given directory
//! and returns its path. The scripts honor the real worker argv contracts
//! so the full spawn-capture-parse path is exercised.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use minerva::{AnalysisEngine, EngineConfig, EngineConfigBuilder};

/// Writes an executable shell script and returns its path.
pub fn write_worker(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let script = format!("#!/bin/sh\n{}\n", body);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A worker that echoes a fixed JSON document.
pub fn echo_worker(dir: &Path, name: &str, json: &str) -> PathBuf {
    write_worker(dir, name, &format!("printf '%s' '{}'", json))
}

/// Builds an engine over an in-memory store with a tight test config.
pub async fn build_engine(
    upload_root: &Path,
    configure: impl FnOnce(EngineConfigBuilder) -> EngineConfigBuilder,
) -> AnalysisEngine {
    // RUST_LOG-controlled output for debugging test failures; first call wins
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let builder = EngineConfig::builder()
        .upload_root(upload_root)
        .enable_reconciliation(false);
    AnalysisEngine::builder()
        .database_url(":memory:")
        .with_config(configure(builder).build())
        .build()
        .await
        .unwrap()
}
