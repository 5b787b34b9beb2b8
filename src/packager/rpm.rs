//! RPM package backend
//!
//! Generates a spec file (preamble as `Key: value` pairs, scriptlet
//! sections as trailing lines) and drives `rpmbuild -bb`. The artifact
//! path is taken from the `Wrote:` line of the build output.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::config::defaults::DEPENDENCY_PACKAGE_MAP;
use crate::content::transform::Transformer;
use crate::core::fields::{DefaultValue, FieldDef, FieldKind, Properties, PropertyValue};
use crate::core::keyvalue::ControlSyntax;
use crate::infra::process::{BuildCommand, BuildOutput};
use crate::packager::{control_rewrite_transformer, Artifact, Dependencies, PackageFormat};

const SPEC_FILE: &str = "package.spec";

/// RPM spec preamble fields
static FIELDS: &[FieldDef] = &[
    FieldDef {
        key: "Name",
        alias: Some("name"),
        kind: FieldKind::Scalar,
        mandatory: true,
        default: None,
    },
    FieldDef {
        key: "Version",
        alias: Some("version"),
        kind: FieldKind::Scalar,
        mandatory: true,
        default: None,
    },
    FieldDef {
        key: "Release",
        alias: Some("release"),
        kind: FieldKind::Integer,
        mandatory: true,
        default: Some(DefaultValue::Int(1)),
    },
    FieldDef {
        key: "Summary",
        alias: Some("description"),
        kind: FieldKind::Scalar,
        mandatory: true,
        default: None,
    },
    FieldDef {
        key: "License",
        alias: Some("license"),
        kind: FieldKind::Scalar,
        mandatory: true,
        default: None,
    },
    FieldDef {
        key: "BuildArch",
        alias: Some("arch"),
        kind: FieldKind::Scalar,
        mandatory: true,
        default: Some(DefaultValue::Str("noarch")),
    },
    FieldDef {
        key: "URL",
        alias: Some("homepage"),
        kind: FieldKind::Scalar,
        mandatory: false,
        default: None,
    },
    FieldDef::optional("Group", FieldKind::Scalar),
    FieldDef::optional("Vendor", FieldKind::Scalar),
    FieldDef::optional("Packager", FieldKind::Scalar),
    FieldDef::optional("Requires", FieldKind::List),
    FieldDef::optional("Provides", FieldKind::List),
    FieldDef::optional("Conflicts", FieldKind::List),
    FieldDef::optional("Obsoletes", FieldKind::List),
    FieldDef::optional("AutoReqProv", FieldKind::Scalar),
];

fn wrote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Wrote:\s+(\S+\.rpm)").expect("wrote regex is valid"))
}

/// RPM package format
pub struct RpmFormat;

impl RpmFormat {
    /// Fold the dependency map into `Requires` as `name >= version`
    /// clauses, mapping runtime names to their RPM package names
    fn merge_requires(properties: &Properties, dependencies: &Dependencies) -> Properties {
        if dependencies.is_empty() {
            return properties.clone();
        }
        let mut requires = match properties.get("Requires") {
            Some(PropertyValue::List(items)) => items.clone(),
            Some(PropertyValue::Scalar(s)) => vec![s.clone()],
            _ => Vec::new(),
        };
        for (name, constraint) in dependencies {
            let mapped = DEPENDENCY_PACKAGE_MAP
                .iter()
                .find(|(from, _)| from == name)
                .map_or(name.as_str(), |(_, to)| *to);
            let version = constraint.trim_start_matches(['>', '<', '=', '~', '^']);
            let op = match &constraint[..constraint.len() - version.len()] {
                "" | "^" | "~" => ">=",
                "=" => "=",
                other => other,
            };
            requires.push(format!("{mapped} {op} {}", version.trim()));
        }
        let mut properties = properties.clone();
        properties.insert("Requires".to_string(), PropertyValue::List(requires));
        properties
    }

    /// Scriptlet sections following the preamble. A spec synthesized from
    /// nothing installs the staged tree as-is and claims every file.
    fn trailing_lines(properties: &Properties) -> Vec<String> {
        let description = properties
            .get("Summary")
            .and_then(PropertyValue::as_scalar)
            .unwrap_or_default()
            .to_string();
        vec![
            String::new(),
            "%description".to_string(),
            description,
            String::new(),
            "%install".to_string(),
            "cp -r %{_sourcedir}/* %{buildroot}".to_string(),
            String::new(),
            "%files".to_string(),
            "%defattr(-,root,root)".to_string(),
            "/".to_string(),
        ]
    }
}

impl PackageFormat for RpmFormat {
    fn name(&self) -> &'static str {
        "rpm"
    }

    fn control_file(&self) -> &'static str {
        SPEC_FILE
    }

    fn schema(&self) -> &'static [FieldDef] {
        FIELDS
    }

    fn control_transformer(
        &self,
        properties: &Properties,
        dependencies: &Dependencies,
    ) -> Transformer {
        let properties = Self::merge_requires(properties, dependencies);
        let trailing = Self::trailing_lines(&properties);
        control_rewrite_transformer(
            SPEC_FILE,
            FIELDS,
            properties,
            ControlSyntax::ColonPairs,
            trailing,
        )
    }

    fn build_command(&self, staging: &Path, _properties: &Properties) -> BuildCommand {
        BuildCommand::new("rpmbuild", staging)
            .arg("--define")
            .arg(format!("_topdir {}", staging.display()))
            .arg("--define")
            .arg(format!("_sourcedir {}", staging.display()))
            .arg("--build-in-place")
            .arg("-bb")
            .arg(SPEC_FILE)
    }

    fn parse_artifact(
        &self,
        output: &BuildOutput,
        _properties: &Properties,
        _staging: &Path,
    ) -> Option<Artifact> {
        let combined = output.combined();
        let captures = wrote_re().captures(&combined)?;
        let path = Path::new(&captures[1]).to_path_buf();
        let id = path
            .file_stem()
            .map_or_else(|| captures[1].to_string(), |s| s.to_string_lossy().into_owned());
        Some(Artifact {
            id,
            path: Some(path),
        })
    }
}
