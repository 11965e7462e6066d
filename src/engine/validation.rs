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

//! Submission validation.
//!
//! Structural checks run before any execution record is created: a
//! rejected request leaves no trace in the store. Messages name the
//! violated limit so callers can surface them directly.

use crate::config::EngineConfig;
use crate::error::SubmissionError;

/// An uploaded file as received from the outer transport layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// The client-supplied filename. Used only for its extension and as
    /// the input descriptor; never trusted as a path.
    pub file_name: String,
    /// The file contents.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// The lowercased extension, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// Extensions accepted for dataset analysis submissions.
const DATASET_EXTENSIONS: &[&str] = &["csv"];

/// Extensions accepted for resume screening submissions.
const RESUME_EXTENSIONS: &[&str] = &["txt"];

/// Validates a single dataset file.
pub fn validate_dataset_file(
    file: &UploadedFile,
    config: &EngineConfig,
) -> Result<(), SubmissionError> {
    validate_file(file, DATASET_EXTENSIONS, config)
}

/// Validates a resume screening batch and its job description.
pub fn validate_resume_batch(
    files: &[UploadedFile],
    job_description: &str,
    config: &EngineConfig,
) -> Result<(), SubmissionError> {
    if files.is_empty() {
        return Err(SubmissionError::Validation(
            "no resume files provided".to_string(),
        ));
    }
    if files.len() > config.max_resume_files {
        return Err(SubmissionError::Validation(format!(
            "too many resume files: {} exceeds the limit of {}",
            files.len(),
            config.max_resume_files
        )));
    }
    if job_description.trim().chars().count() < config.min_description_chars {
        return Err(SubmissionError::Validation(format!(
            "job description must be at least {} characters",
            config.min_description_chars
        )));
    }
    for file in files {
        validate_file(file, RESUME_EXTENSIONS, config)?;
    }
    Ok(())
}

fn validate_file(
    file: &UploadedFile,
    allowed: &[&str],
    config: &EngineConfig,
) -> Result<(), SubmissionError> {
    if file.file_name.trim().is_empty() {
        return Err(SubmissionError::Validation(
            "uploaded file has no name".to_string(),
        ));
    }
    if file.bytes.is_empty() {
        return Err(SubmissionError::Validation(format!(
            "file '{}' is empty",
            file.file_name
        )));
    }
    if file.bytes.len() > config.max_file_bytes {
        return Err(SubmissionError::Validation(format!(
            "file '{}' is {} bytes, which exceeds the limit of {} bytes",
            file.file_name,
            file.bytes.len(),
            config.max_file_bytes
        )));
    }
    match file.extension() {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
        _ => Err(SubmissionError::Validation(format!(
            "file '{}' has an unsupported type; allowed: {}",
            file.file_name,
            allowed.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::builder()
            .max_file_bytes(1024)
            .max_resume_files(3)
            .min_description_chars(10)
            .build()
    }

    fn csv() -> UploadedFile {
        UploadedFile::new("sales.csv", b"a,b\n1,2\n".to_vec())
    }

    fn txt(name: &str) -> UploadedFile {
        UploadedFile::new(name, b"resume text".to_vec())
    }

    #[test]
    fn test_valid_dataset_file() {
        assert!(validate_dataset_file(&csv(), &config()).is_ok());
        // Extension check is case-insensitive
        let upper = UploadedFile::new("SALES.CSV", b"a,b\n".to_vec());
        assert!(validate_dataset_file(&upper, &config()).is_ok());
    }

    #[test]
    fn test_wrong_extension_is_rejected() {
        let file = UploadedFile::new("report.xlsx", b"data".to_vec());
        let err = validate_dataset_file(&file, &config()).unwrap_err();
        assert!(err.to_string().contains("unsupported type"));
    }

    #[test]
    fn test_oversized_file_names_the_limit() {
        let file = UploadedFile::new("big.csv", vec![0u8; 2048]);
        let err = validate_dataset_file(&file, &config()).unwrap_err();
        assert!(err.to_string().contains("1024"));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let file = UploadedFile::new("empty.csv", vec![]);
        assert!(validate_dataset_file(&file, &config()).is_err());
    }

    #[test]
    fn test_resume_batch_limits() {
        let cfg = config();
        let description = "a detailed job description";

        assert!(validate_resume_batch(&[txt("a.txt")], description, &cfg).is_ok());

        let err = validate_resume_batch(&[], description, &cfg).unwrap_err();
        assert!(err.to_string().contains("no resume files"));

        let four = vec![txt("a.txt"), txt("b.txt"), txt("c.txt"), txt("d.txt")];
        let err = validate_resume_batch(&four, description, &cfg).unwrap_err();
        assert!(err.to_string().contains("limit of 3"));
    }

    #[test]
    fn test_short_description_names_the_minimum() {
        let err = validate_resume_batch(&[txt("a.txt")], "short", &config()).unwrap_err();
        assert!(err.to_string().contains("at least 10 characters"));
    }

    #[test]
    fn test_resume_batch_rejects_wrong_file_type() {
        let files = vec![txt("a.txt"), UploadedFile::new("b.pdf", b"pdf".to_vec())];
        let err =
            validate_resume_batch(&files, "a detailed job description", &config()).unwrap_err();
        assert!(err.to_string().contains("b.pdf"));
    }
}
