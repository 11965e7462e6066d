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

//! Worker output parsing.
//!
//! Workers emit exactly one JSON object on stdout, but real workers also
//! leak log lines around the payload. Parsing is strict first, then falls
//! back to the substring between the first `{` and the last `}`.
//!
//! The document is modeled as an open [`serde_json::Map`] rather than a
//! fixed-field struct: worker schemas grow additively across versions and
//! every field must pass through the core untouched. Only `success` and
//! `summary` are ever inspected upstream.

use thiserror::Error;

/// A parsed worker result document. Open schema; key order preserved when
/// `serde_json`'s `preserve_order` is enabled by an embedder.
pub type ResultDocument = serde_json::Map<String, serde_json::Value>;

/// Why stdout could not be turned into a result document.
///
/// Empty output is kept distinct from garbage output: "worker produced
/// nothing" and "worker produced something unparseable" point operators at
/// different failure modes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutputParseError {
    /// Stdout was empty or whitespace-only.
    #[error("worker produced no output")]
    EmptyOutput,

    /// Stdout contained no parseable JSON object.
    #[error("invalid output format: no JSON object found in worker output")]
    NotValidDocument,
}

/// Parses raw worker stdout into a result document.
///
/// No side effects; safe on arbitrary input.
pub fn parse_worker_output(raw: &str) -> Result<ResultDocument, OutputParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(OutputParseError::EmptyOutput);
    }

    if let Some(document) = parse_object(trimmed) {
        return Ok(document);
    }

    // Fallback: workers sometimes interleave log lines with the payload.
    // Take the span from the first opening brace to the last closing brace.
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Some(document) = parse_object(&trimmed[start..=end]) {
                return Ok(document);
            }
        }
    }

    Err(OutputParseError::NotValidDocument)
}

/// Strict parse requiring a top-level JSON object.
fn parse_object(text: &str) -> Option<ResultDocument> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}
