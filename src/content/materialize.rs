//! Staging materializer
//!
//! Writes the final entry stream to the staging directory: joins
//! destination prefix and entry name, runs the result through a
//! caller-supplied path expander, creates parent directories, resolves the
//! file mode against an ordered override table, and stream-copies the
//! entry bytes. This is the only component that writes to the staging
//! tree; it never deletes or truncates files it is not itself writing.

use glob::Pattern;
use std::path::{Path, PathBuf};

use crate::content::{ContentEntry, EntrySource};
use crate::error::{ConfigurationError, MaterializationError};

/// Remaps a staging-relative path, e.g. to install under a prefix
pub type PathExpander = Box<dyn Fn(&Path) -> PathBuf + Send + Sync>;

/// Writes entries into a destination directory
pub struct Materializer {
    destination: PathBuf,
    expander: Option<PathExpander>,
    modes: Vec<(Pattern, u32)>,
}

impl Materializer {
    /// Materializer writing into `destination`
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            expander: None,
            modes: Vec::new(),
        }
    }

    /// Install a path expander; identity when none is set
    #[must_use]
    pub fn with_expander(mut self, expander: PathExpander) -> Self {
        self.expander = Some(expander);
        self
    }

    /// Install the ordered mode-override table; the first pattern matching
    /// an entry name wins
    pub fn with_modes(mut self, table: &[(String, u32)]) -> Result<Self, ConfigurationError> {
        self.modes = table
            .iter()
            .map(|(raw, mode)| {
                Pattern::new(raw)
                    .map(|p| (p, *mode))
                    .map_err(|e| ConfigurationError::InvalidModePattern {
                        pattern: raw.clone(),
                        error: e.to_string(),
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    /// Write one entry; returns the path written.
    ///
    /// When two entries resolve to the same destination the last write
    /// wins; only the file being written is ever truncated.
    pub async fn write_entry(
        &self,
        entry: ContentEntry,
    ) -> Result<PathBuf, MaterializationError> {
        let mut relative = PathBuf::new();
        if let Some(dest) = &entry.destination {
            relative.push(dest);
        }
        relative.push(&entry.name);
        if let Some(expander) = &self.expander {
            relative = expander(&relative);
        }
        let target = self.destination.join(relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MaterializationError::CreateDir {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                }
            })?;
        }

        let mode = self.resolve_mode(&entry);
        self.copy_bytes(&entry, &target).await?;

        #[cfg(unix)]
        if let Some(mode) = mode {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| MaterializationError::SetMode {
                    path: target.clone(),
                    mode,
                    error: e.to_string(),
                })?;
        }

        Ok(target)
    }

    fn resolve_mode(&self, entry: &ContentEntry) -> Option<u32> {
        for (pattern, mode) in &self.modes {
            if pattern.matches(&entry.name) {
                return Some(*mode);
            }
        }
        entry.mode
    }

    async fn copy_bytes(
        &self,
        entry: &ContentEntry,
        target: &Path,
    ) -> Result<(), MaterializationError> {
        match entry.source() {
            EntrySource::File(source) => {
                let mut reader = tokio::fs::File::open(source).await.map_err(|e| {
                    MaterializationError::ReadSource {
                        entry: entry.name.clone(),
                        error: e.to_string(),
                    }
                })?;
                let mut writer = tokio::fs::File::create(target).await.map_err(|e| {
                    MaterializationError::WriteFile {
                        path: target.to_path_buf(),
                        error: e.to_string(),
                    }
                })?;
                tokio::io::copy(&mut reader, &mut writer)
                    .await
                    .map_err(|e| MaterializationError::WriteFile {
                        path: target.to_path_buf(),
                        error: e.to_string(),
                    })?;
                Ok(())
            }
            EntrySource::Bytes(bytes) => tokio::fs::write(target, bytes).await.map_err(|e| {
                MaterializationError::WriteFile {
                    path: target.to_path_buf(),
                    error: e.to_string(),
                }
            }),
            EntrySource::Empty => tokio::fs::write(target, b"").await.map_err(|e| {
                MaterializationError::WriteFile {
                    path: target.to_path_buf(),
                    error: e.to_string(),
                }
            }),
        }
    }
}
