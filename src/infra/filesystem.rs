//! Filesystem operations
//!
//! Staging directory handling with path-carrying errors.

use std::path::Path;

use crate::error::MaterializationError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), MaterializationError> {
    std::fs::create_dir_all(path).map_err(|e| MaterializationError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}
