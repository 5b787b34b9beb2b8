//! Variable expansion context
//!
//! Resolves `${name}` and `{{name}}` placeholders in content patterns,
//! destination paths, and publish targets. Unresolved placeholders pass
//! through literally so downstream tooling can still see them.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{(?P<dollar>[A-Za-z_][\w.-]*)\}|\{\{(?P<brace>[A-Za-z_][\w.-]*)\}\}")
            .expect("placeholder regex is valid")
    })
}

/// Expansion context for one packager invocation.
///
/// Carries the package directory (the root content scans resolve against)
/// and a flat string variable map fed from the manifest properties and the
/// invocation options.
#[derive(Debug, Clone, Default)]
pub struct ExpansionContext {
    dir: PathBuf,
    vars: BTreeMap<String, String>,
}

impl ExpansionContext {
    /// Create a context rooted at the given package directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            vars: BTreeMap::new(),
        }
    }

    /// Add a variable
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Add all variables from an iterator
    #[must_use]
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.vars.insert(k.into(), v.into());
        }
        self
    }

    /// The package directory content scans resolve against
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up a single variable
    pub fn evaluate(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Expand all `${name}` and `{{name}}` placeholders in `text`.
    ///
    /// Placeholders naming an unknown variable are left in place, original
    /// delimiters included.
    pub fn expand(&self, text: &str) -> String {
        placeholder_re()
            .replace_all(text, |caps: &Captures<'_>| {
                let key = caps
                    .name("dollar")
                    .or_else(|| caps.name("brace"))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match self.vars.get(key) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
