//! Filesystem content provider
//!
//! Expands the configured content mappings against the invocation context
//! and glob-matches files under the package directory. A bare pattern
//! resolves against the context directory; a `{base, pattern}` mapping
//! resolves under `context dir / base` with the pattern defaulting to
//! `**/*`.

use glob::MatchOptions;
use std::path::{Path, PathBuf};

use crate::config::defaults::DEFAULT_CONTENT_PATTERN;
use crate::content::{spawn_scan, ContentEntry, ContentProvider, EntrySink, EntryStream};
use crate::core::context::ExpansionContext;
use crate::core::manifest::ContentMapping;
use crate::error::ProviderError;

/// Content provided from the file system
#[derive(Debug, Clone)]
pub struct FileContentProvider {
    mappings: Vec<ContentMapping>,
}

impl FileContentProvider {
    /// Create a provider over the given content mappings
    pub fn new(mappings: Vec<ContentMapping>) -> Self {
        Self { mappings }
    }

    /// Convenience constructor for a single bare pattern
    pub fn from_pattern(pattern: impl Into<String>) -> Self {
        Self::new(vec![ContentMapping {
            pattern: Some(pattern.into()),
            base: None,
            destination: None,
        }])
    }
}

impl ContentProvider for FileContentProvider {
    fn entries(&self, ctx: &ExpansionContext) -> EntryStream {
        let mappings = self.mappings.clone();
        let ctx = ctx.clone();
        spawn_scan(move |sink| {
            for mapping in &mappings {
                if !scan_mapping(&ctx, mapping, &sink) {
                    return;
                }
            }
        })
    }
}

/// Glob one mapping into the sink; returns false once the consumer is gone
fn scan_mapping(ctx: &ExpansionContext, mapping: &ContentMapping, sink: &EntrySink) -> bool {
    let cwd = match &mapping.base {
        Some(base) => ctx.dir().join(ctx.expand(base)),
        None => ctx.dir().to_path_buf(),
    };
    let pattern = mapping
        .pattern
        .as_deref()
        .unwrap_or(DEFAULT_CONTENT_PATTERN);
    let pattern = ctx.expand(pattern);
    let destination = mapping.destination.as_ref().map(|d| ctx.expand(d));

    if !cwd.is_dir() {
        return sink.send(Err(ProviderError::BaseDirUnreadable {
            path: cwd,
            error: "not a directory".to_string(),
        }));
    }

    let full_pattern = cwd.join(&pattern).to_string_lossy().into_owned();
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::default()
    };

    let matches = match glob::glob_with(&full_pattern, options) {
        Ok(paths) => paths,
        Err(e) => {
            return sink.send(Err(ProviderError::InvalidPattern {
                pattern,
                error: e.to_string(),
            }));
        }
    };

    for matched in matches {
        let path = match matched {
            Ok(path) => path,
            Err(e) => {
                return sink.send(Err(ProviderError::Io {
                    path: e.path().to_path_buf(),
                    error: e.error().to_string(),
                }));
            }
        };
        if !path.is_file() {
            continue;
        }
        let entry = file_entry(&cwd, &path).with_destination(destination.clone());
        if !sink.send(Ok(entry)) {
            return false;
        }
    }

    true
}

fn file_entry(cwd: &Path, path: &PathBuf) -> ContentEntry {
    let name = path
        .strip_prefix(cwd)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();
    ContentEntry::from_file(name, path.clone())
}
