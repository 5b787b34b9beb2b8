//! Control-file key/value rewriting
//!
//! The same engine serves every backend: parse an existing (possibly empty)
//! control file line by line, replace the values of schema fields from the
//! validated properties, pass everything else through verbatim, and append
//! the schema fields the file did not carry. Backends differ only in line
//! syntax and trailing output.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::core::fields::{FieldDef, Properties, PropertyValue};

fn bare_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\w+$").expect("bare word regex is valid"))
}

/// Shell-quote a value: bare words stay bare, everything else is wrapped
/// in single quotes
pub fn quote(value: &str) -> String {
    if bare_word_re().is_match(value) {
        value.to_string()
    } else {
        format!("'{value}'")
    }
}

/// Line syntax of a control file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSyntax {
    /// `key=value` with arrays as `(a b c)` (PKGBUILD)
    ShellAssign,
    /// `LABEL key="value"` (Dockerfile)
    DockerLabel,
    /// `Key: value` (Debian control, RPM spec preamble)
    ColonPairs,
}

impl ControlSyntax {
    /// Extract the field key a line assigns, if any
    pub fn parse_key<'a>(&self, line: &'a str) -> Option<&'a str> {
        match self {
            Self::ShellAssign => {
                let (key, _) = line.split_once('=')?;
                let key = key.trim();
                bare_word_re().is_match(key).then_some(key)
            }
            Self::DockerLabel => {
                let rest = line.trim_start().strip_prefix("LABEL ")?;
                let (key, _) = rest.split_once('=')?;
                let key = key.trim();
                bare_word_re().is_match(key).then_some(key)
            }
            Self::ColonPairs => {
                let (key, _) = line.split_once(':')?;
                let key = key.trim();
                (!key.is_empty() && !key.contains(char::is_whitespace)).then_some(key)
            }
        }
    }

    /// Render one field line
    pub fn emit(&self, key: &str, value: &PropertyValue) -> String {
        match self {
            Self::ShellAssign => format!("{key}={}", render_shell(value)),
            Self::DockerLabel => format!("LABEL {key}=\"{}\"", render_plain(value, " ")),
            Self::ColonPairs => format!("{key}: {}", render_plain(value, ", ")),
        }
    }
}

fn render_shell(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Scalar(s) => quote(s),
        PropertyValue::Integer(i) => i.to_string(),
        PropertyValue::List(items) => {
            let inner: Vec<String> = items.iter().map(|s| quote(s)).collect();
            format!("({})", inner.join(" "))
        }
    }
}

fn render_plain(value: &PropertyValue, list_sep: &str) -> String {
    match value {
        PropertyValue::Scalar(s) => s.clone(),
        PropertyValue::Integer(i) => i.to_string(),
        PropertyValue::List(items) => items.join(list_sep),
    }
}

/// Rewrite a control file.
///
/// Lines assigning a schema field are re-emitted with the property value
/// (or kept verbatim when no property covers the field); all other lines
/// pass through untouched. Schema fields with a property value that never
/// appeared in the input are appended in schema order, then `trailing`
/// lines close the file.
pub fn rewrite_control(
    input: &str,
    schema: &[FieldDef],
    properties: &Properties,
    syntax: ControlSyntax,
    trailing: &[String],
) -> String {
    let known: BTreeSet<&str> = schema.iter().map(|d| d.key).collect();
    let mut present: BTreeSet<String> = BTreeSet::new();
    let mut out = String::new();

    for line in input.lines() {
        match syntax.parse_key(line) {
            Some(key) if known.contains(key) => {
                present.insert(key.to_string());
                match properties.get(key) {
                    Some(value) => {
                        out.push_str(&syntax.emit(key, value));
                        out.push('\n');
                    }
                    None => {
                        out.push_str(line);
                        out.push('\n');
                    }
                }
            }
            _ => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    for def in schema {
        if present.contains(def.key) {
            continue;
        }
        if let Some(value) = properties.get(def.key) {
            out.push_str(&syntax.emit(def.key, value));
            out.push('\n');
        }
    }

    for line in trailing {
        out.push_str(line);
        out.push('\n');
    }

    out
}
