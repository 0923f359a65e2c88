//! File utilities for selecting and validating PDF inputs.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::FileError;
use crate::models::FilesConfig;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Calculate SHA-256 checksum of content.
pub fn calculate_checksum(content: &str) -> String {
    let hash = Sha256::digest(content.as_bytes());
    hex::encode(hash)
}

/// File size in megabytes.
pub fn file_size_mb(path: &Path) -> std::io::Result<f64> {
    Ok(fs::metadata(path)?.len() as f64 / BYTES_PER_MB)
}

/// Check whether the extension is one of the supported document formats (case-insensitive).
pub fn has_supported_extension(path: &Path, supported: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| supported.iter().any(|s| s.eq_ignore_ascii_case(&ext)))
}

/// Validate that a path exists, has a supported extension and is within the size limit.
pub fn validate_pdf_file(path: &Path, config: &FilesConfig) -> Result<(), FileError> {
    if !path.is_file() {
        return Err(FileError::NotFound(path.to_path_buf()));
    }

    if !has_supported_extension(path, &config.supported_extensions) {
        return Err(FileError::UnsupportedExtension(path.to_path_buf()));
    }

    let size_mb = file_size_mb(path)?;
    if size_mb > config.max_pdf_size_mb as f64 {
        return Err(FileError::TooLarge {
            path: path.to_path_buf(),
            size_mb,
            max_mb: config.max_pdf_size_mb,
        });
    }

    Ok(())
}

/// Recursively collect files with a supported extension, sorted and de-duplicated.
pub fn find_pdf_files(directory: &Path, supported: &[String]) -> Vec<PathBuf> {
    let files: BTreeSet<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_supported_extension(path, supported))
        .collect();

    files.into_iter().collect()
}
