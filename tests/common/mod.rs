//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::path::PathBuf;
use tempfile::TempDir;

/// Test package context
///
/// Creates a temporary package directory and provides utilities for
/// setting up packaging scenarios.
pub struct TestPackage {
    /// Temporary directory holding the package
    pub dir: TempDir,
}

impl TestPackage {
    /// Create a new test package in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the package directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the package directory
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Write a package.toml manifest
    pub fn write_manifest(&self, content: &str) {
        self.create_file("package.toml", content);
    }
}

impl Default for TestPackage {
    fn default() -> Self {
        Self::new()
    }
}
