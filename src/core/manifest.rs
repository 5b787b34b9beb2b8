//! Package manifest (package.toml) parsing
//!
//! The manifest carries package metadata, the dependency map, content
//! mappings, and per-format property tables. When no package.toml exists
//! the loader falls back to an npm package.json, which covers the common
//! metadata and the `engines` dependency map.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::fields::{Properties, PropertyValue};
use crate::error::ConfigurationError;

/// The package manifest (package.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    /// Package metadata
    #[serde(default)]
    pub package: PackageMeta,

    /// Dependency name to version constraint map
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Ordered content mappings
    #[serde(default)]
    pub content: Vec<ContentMapping>,

    /// Ordered file mode overrides, first match wins
    #[serde(default)]
    pub modes: Vec<ModeMapping>,

    /// Extra properties per output format, e.g. `[pkg]` or `[docker]`
    #[serde(default)]
    pub pkg: Option<toml::Table>,
    #[serde(default)]
    pub deb: Option<toml::Table>,
    #[serde(default)]
    pub rpm: Option<toml::Table>,
    #[serde(default)]
    pub docker: Option<toml::Table>,

    /// Publish target; may contain `{{key}}` placeholders. Written after
    /// a format table it is scoped into that table by TOML and gets
    /// hoisted back out during parsing.
    #[serde(default)]
    pub publish: Option<String>,
}

/// Package metadata shared by all formats
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageMeta {
    /// Package name
    #[serde(default)]
    pub name: String,

    /// Package version
    #[serde(default)]
    pub version: String,

    /// One-line description
    #[serde(default)]
    pub description: Option<String>,

    /// License identifier
    #[serde(default)]
    pub license: Option<String>,

    /// Homepage URL
    #[serde(default)]
    pub homepage: Option<String>,

    /// Maintainer, `Name <email>`
    #[serde(default)]
    pub maintainer: Option<String>,
}

/// One content mapping: a bare glob pattern, or a `{base, pattern}` pair
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentMapping {
    /// Glob pattern; defaults to `**/*` when a base is given
    #[serde(default)]
    pub pattern: Option<String>,

    /// Base directory the pattern resolves under
    #[serde(default)]
    pub base: Option<String>,

    /// Destination sub-path prefix inside the package
    #[serde(default)]
    pub destination: Option<String>,
}

/// One mode override: entries matching the pattern get the octal mode
#[derive(Debug, Clone, Deserialize)]
pub struct ModeMapping {
    /// Glob pattern matched against entry names
    pub pattern: String,

    /// Octal mode string, e.g. "755"
    pub mode: String,
}

impl PackageManifest {
    /// Load the manifest from a package directory.
    ///
    /// Prefers `package.toml`; falls back to npm `package.json`.
    pub fn load(dir: &Path) -> Result<Self, ConfigurationError> {
        let toml_path = dir.join("package.toml");
        if toml_path.exists() {
            let text =
                std::fs::read_to_string(&toml_path).map_err(|e| ConfigurationError::Manifest {
                    path: toml_path.clone(),
                    error: e.to_string(),
                })?;
            return Self::from_toml(&text).map_err(|e| ConfigurationError::Manifest {
                path: toml_path,
                error: e.to_string(),
            });
        }

        let json_path = dir.join("package.json");
        if json_path.exists() {
            let text =
                std::fs::read_to_string(&json_path).map_err(|e| ConfigurationError::Manifest {
                    path: json_path.clone(),
                    error: e.to_string(),
                })?;
            return Self::from_package_json(&text).map_err(|error| ConfigurationError::Manifest {
                path: json_path,
                error,
            });
        }

        Err(ConfigurationError::ManifestNotFound {
            path: dir.to_path_buf(),
        })
    }

    /// Parse a manifest from TOML text
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let manifest: Self = toml::from_str(text)?;
        Ok(manifest.hoist_publish())
    }

    /// TOML scopes every key after a `[table]` header into that table, so
    /// a trailing top-level `publish` lands inside the last format table.
    /// Hoist it back out instead of silently treating it as a property.
    fn hoist_publish(mut self) -> Self {
        for table in [&mut self.pkg, &mut self.deb, &mut self.rpm, &mut self.docker] {
            let Some(table) = table else { continue };
            if let Some(toml::Value::String(target)) = table.remove("publish") {
                tracing::warn!("'publish' found inside a format table; treating as top-level");
                self.publish.get_or_insert(target);
            }
        }
        self
    }

    /// Build a manifest from npm package.json text
    pub fn from_package_json(text: &str) -> Result<Self, String> {
        let json: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;

        let str_field = |key: &str| {
            json.get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        // npm allows `license` as either a string or `{ "type": ... }`
        let license = json.get("license").and_then(|v| {
            v.as_str()
                .map(str::to_string)
                .or_else(|| v.get("type").and_then(|t| t.as_str()).map(str::to_string))
        });

        let maintainer = json.get("author").and_then(|a| {
            a.as_str().map(str::to_string).or_else(|| {
                let name = a.get("name")?.as_str()?;
                match a.get("email").and_then(|e| e.as_str()) {
                    Some(email) => Some(format!("{name} <{email}>")),
                    None => Some(name.to_string()),
                }
            })
        });

        let dependencies = json
            .get("engines")
            .and_then(|e| e.as_object())
            .map(|engines| {
                engines
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            package: PackageMeta {
                name: str_field("name").unwrap_or_default(),
                version: str_field("version").unwrap_or_default(),
                description: str_field("description"),
                license,
                homepage: str_field("homepage"),
                maintainer,
            },
            dependencies,
            ..Self::default()
        })
    }

    /// Raw properties for one format: shared metadata under its input
    /// aliases, overlaid with the format's extra property table
    pub fn properties_for(&self, format: &str) -> Properties {
        let mut props = Properties::new();

        let meta = &self.package;
        if !meta.name.is_empty() {
            props.insert("name".into(), PropertyValue::Scalar(meta.name.clone()));
        }
        if !meta.version.is_empty() {
            props.insert(
                "version".into(),
                PropertyValue::Scalar(meta.version.clone()),
            );
        }
        for (key, value) in [
            ("description", &meta.description),
            ("license", &meta.license),
            ("homepage", &meta.homepage),
            ("maintainer", &meta.maintainer),
        ] {
            if let Some(v) = value {
                props.insert(key.into(), PropertyValue::Scalar(v.clone()));
            }
        }

        let extra = match format {
            "pkg" => &self.pkg,
            "deb" => &self.deb,
            "rpm" => &self.rpm,
            "docker" => &self.docker,
            _ => &None,
        };
        if let Some(table) = extra {
            for (key, value) in table {
                if let Some(v) = PropertyValue::from_toml(value) {
                    props.insert(key.clone(), v);
                }
            }
        }

        props
    }

    /// Variables exposed to the expansion context
    pub fn variables(&self) -> Vec<(String, String)> {
        let meta = &self.package;
        let mut vars = vec![
            ("name".to_string(), meta.name.clone()),
            ("version".to_string(), meta.version.clone()),
        ];
        if let Some(desc) = &meta.description {
            vars.push(("description".to_string(), desc.clone()));
        }
        if let Some(license) = &meta.license {
            vars.push(("license".to_string(), license.clone()));
        }
        vars
    }

    /// Parse the ordered mode table into numeric modes
    pub fn mode_table(&self) -> Result<Vec<(String, u32)>, ConfigurationError> {
        self.modes
            .iter()
            .map(|m| {
                u32::from_str_radix(&m.mode, 8)
                    .map(|mode| (m.pattern.clone(), mode))
                    .map_err(|_| ConfigurationError::InvalidMode {
                        pattern: m.pattern.clone(),
                        value: m.mode.clone(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[package]
name = "abc"
version = "1.0.0"
description = "a description"
license = "MIT"

[dependencies]
node = "lts-slim"

[[content]]
pattern = "fixtures/content/**"

[[content]]
base = "dist"
destination = "usr/lib/abc"

[[modes]]
pattern = "*.sh"
mode = "755"

[docker]
from = "alpine"

publish = "/repo/{{arch}}"
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = PackageManifest::from_toml(MANIFEST).unwrap();
        assert_eq!(manifest.package.name, "abc");
        assert_eq!(manifest.dependencies.get("node").unwrap(), "lts-slim");
        assert_eq!(manifest.content.len(), 2);
        assert_eq!(manifest.content[1].base.as_deref(), Some("dist"));
        assert_eq!(manifest.publish.as_deref(), Some("/repo/{{arch}}"));
    }

    // The fixture writes `publish` after [docker], so TOML parses it into
    // the docker table; from_toml must hoist it back to the top level.
    #[test]
    fn test_publish_after_format_table_is_hoisted() {
        let manifest = PackageManifest::from_toml(MANIFEST).unwrap();
        assert_eq!(manifest.publish.as_deref(), Some("/repo/{{arch}}"));
        assert!(!manifest.docker.as_ref().unwrap().contains_key("publish"));
        // and it never reaches the format's property map
        assert!(!manifest.properties_for("docker").contains_key("publish"));
    }

    #[test]
    fn test_mode_table_parses_octal() {
        let manifest = PackageManifest::from_toml(MANIFEST).unwrap();
        assert_eq!(manifest.mode_table().unwrap(), vec![("*.sh".into(), 0o755)]);
    }

    #[test]
    fn test_mode_table_rejects_bad_octal() {
        let manifest = PackageManifest::from_toml(
            "[[modes]]\npattern = \"*\"\nmode = \"rwx\"\n",
        )
        .unwrap();
        assert!(matches!(
            manifest.mode_table(),
            Err(ConfigurationError::InvalidMode { .. })
        ));
    }

    #[test]
    fn test_properties_for_overlays_format_table() {
        let manifest = PackageManifest::from_toml(MANIFEST).unwrap();
        let props = manifest.properties_for("docker");
        assert_eq!(
            props.get("name"),
            Some(&PropertyValue::Scalar("abc".into()))
        );
        assert_eq!(
            props.get("from"),
            Some(&PropertyValue::Scalar("alpine".into()))
        );
        // docker table does not leak into other formats
        assert!(!manifest.properties_for("pkg").contains_key("from"));
    }

    #[test]
    fn test_from_package_json() {
        let manifest = PackageManifest::from_package_json(
            r#"{
                "name": "abc",
                "version": "1.0.0",
                "description": "a description",
                "license": {"type": "MIT"},
                "author": {"name": "Jo Doe", "email": "jo@example.com"},
                "engines": {"node": ">=16"}
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.package.name, "abc");
        assert_eq!(manifest.package.license.as_deref(), Some("MIT"));
        assert_eq!(
            manifest.package.maintainer.as_deref(),
            Some("Jo Doe <jo@example.com>")
        );
        assert_eq!(manifest.dependencies.get("node").unwrap(), ">=16");
    }
}
