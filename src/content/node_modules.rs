//! Dependency tree content provider
//!
//! Walks the closure of an installed dependency directory (node_modules
//! style) and yields every file that survives an ordered exclusion pattern
//! list. The list is data supplied by the caller, typically
//! [`crate::config::defaults::PRUNE_PATTERNS`], never hardcoded here.

use glob::{MatchOptions, Pattern};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::content::{spawn_scan, ContentEntry, ContentProvider, EntrySink, EntryStream};
use crate::core::context::ExpansionContext;
use crate::error::ProviderError;

/// Content from a dependency directory tree
#[derive(Debug, Clone)]
pub struct NodeModulesProvider {
    root: PathBuf,
    exclude: Vec<String>,
    destination: Option<String>,
}

impl NodeModulesProvider {
    /// Provider over `root` (relative to the context directory unless
    /// absolute), pruned by the given ordered exclusion patterns
    pub fn new(root: impl Into<PathBuf>, exclude: &[&str]) -> Self {
        Self {
            root: root.into(),
            exclude: exclude.iter().map(|s| (*s).to_string()).collect(),
            destination: None,
        }
    }

    /// Set the destination sub-path prefix for all entries
    #[must_use]
    pub fn with_destination(mut self, destination: Option<String>) -> Self {
        self.destination = destination;
        self
    }
}

impl ContentProvider for NodeModulesProvider {
    fn entries(&self, ctx: &ExpansionContext) -> EntryStream {
        let root = if self.root.is_absolute() {
            self.root.clone()
        } else {
            ctx.dir().join(&self.root)
        };
        let base = ctx.dir().to_path_buf();
        let exclude = self.exclude.clone();
        let destination = self.destination.clone();
        spawn_scan(move |sink| scan_tree(&root, &base, &exclude, destination.as_deref(), &sink))
    }
}

fn scan_tree(
    root: &PathBuf,
    base: &PathBuf,
    exclude: &[String],
    destination: Option<&str>,
    sink: &EntrySink,
) {
    let patterns = match compile_patterns(exclude) {
        Ok(p) => p,
        Err(e) => {
            sink.send(Err(e));
            return;
        }
    };

    if !root.is_dir() {
        sink.send(Err(ProviderError::BaseDirUnreadable {
            path: root.clone(),
            error: "not a directory".to_string(),
        }));
        return;
    }

    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::default()
    };

    for item in WalkDir::new(root).sort_by_file_name() {
        let item = match item {
            Ok(i) => i,
            Err(e) => {
                sink.send(Err(ProviderError::Io {
                    path: e.path().map(PathBuf::from).unwrap_or_else(|| root.clone()),
                    error: e.to_string(),
                }));
                return;
            }
        };
        if !item.file_type().is_file() {
            continue;
        }

        let name = item
            .path()
            .strip_prefix(base)
            .unwrap_or(item.path())
            .to_string_lossy()
            .into_owned();
        if patterns.iter().any(|p| p.matches_with(&name, options)) {
            continue;
        }

        let entry = ContentEntry::from_file(name, item.path())
            .with_destination(destination.map(str::to_string));
        if !sink.send(Ok(entry)) {
            return;
        }
    }
}

fn compile_patterns(exclude: &[String]) -> Result<Vec<Pattern>, ProviderError> {
    exclude
        .iter()
        .map(|raw| {
            Pattern::new(raw).map_err(|e| ProviderError::InvalidPattern {
                pattern: raw.clone(),
                error: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::PRUNE_PATTERNS;
    use futures::StreamExt;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let nm = dir.path().join("node_modules/dep");
        fs::create_dir_all(nm.join("lib")).unwrap();
        fs::create_dir_all(nm.join("test")).unwrap();
        fs::write(nm.join("lib/index.js"), "x").unwrap();
        fs::write(nm.join("index.d.ts"), "x").unwrap();
        fs::write(nm.join("README.md"), "x").unwrap();
        fs::write(nm.join("test/spec.js"), "x").unwrap();
        fs::write(nm.join("package.json"), "{}").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_prune_patterns_drop_junk() {
        let dir = fixture();
        let ctx = ExpansionContext::new(dir.path());
        let provider = NodeModulesProvider::new("node_modules", PRUNE_PATTERNS);
        let mut names: Vec<String> = provider
            .entries(&ctx)
            .map(|r| r.unwrap().name)
            .collect()
            .await;
        names.sort();
        assert_eq!(
            names,
            vec![
                "node_modules/dep/lib/index.js",
                "node_modules/dep/package.json"
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_exclusion_keeps_everything() {
        let dir = fixture();
        let ctx = ExpansionContext::new(dir.path());
        let provider = NodeModulesProvider::new("node_modules", &[]);
        let names: Vec<String> = provider
            .entries(&ctx)
            .map(|r| r.unwrap().name)
            .collect()
            .await;
        assert_eq!(names.len(), 5);
    }

    #[tokio::test]
    async fn test_missing_root_is_a_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExpansionContext::new(dir.path());
        let provider = NodeModulesProvider::new("node_modules", &[]);
        let results: Vec<_> = provider.entries(&ctx).collect().await;
        assert!(matches!(
            results.first(),
            Some(Err(ProviderError::BaseDirUnreadable { .. }))
        ));
    }
}
