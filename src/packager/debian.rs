//! Debian package backend
//!
//! Generates `DEBIAN/control` and drives `dpkg-deb --build` over the
//! staging tree. The resulting `.deb` lands next to the staging directory.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::config::defaults::DEPENDENCY_PACKAGE_MAP;
use crate::content::transform::Transformer;
use crate::core::fields::{DefaultValue, FieldDef, FieldKind, Properties, PropertyValue};
use crate::core::keyvalue::ControlSyntax;
use crate::infra::process::{BuildCommand, BuildOutput};
use crate::packager::{control_rewrite_transformer, Artifact, Dependencies, PackageFormat};

const CONTROL: &str = "DEBIAN/control";

/// Debian control fields
static FIELDS: &[FieldDef] = &[
    FieldDef {
        key: "Package",
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
        key: "Architecture",
        alias: Some("arch"),
        kind: FieldKind::Scalar,
        mandatory: true,
        default: Some(DefaultValue::Str("all")),
    },
    FieldDef {
        key: "Maintainer",
        alias: Some("maintainer"),
        kind: FieldKind::Scalar,
        mandatory: false,
        default: None,
    },
    FieldDef {
        key: "Description",
        alias: Some("description"),
        kind: FieldKind::Scalar,
        mandatory: true,
        default: None,
    },
    FieldDef {
        key: "Priority",
        alias: None,
        kind: FieldKind::Scalar,
        mandatory: false,
        default: Some(DefaultValue::Str("optional")),
    },
    FieldDef {
        key: "Homepage",
        alias: Some("homepage"),
        kind: FieldKind::Scalar,
        mandatory: false,
        default: None,
    },
    FieldDef::optional("Section", FieldKind::Scalar),
    FieldDef::optional("Essential", FieldKind::Scalar),
    FieldDef::optional("Installed-Size", FieldKind::Integer),
    FieldDef::optional("Depends", FieldKind::List),
    FieldDef::optional("Pre-Depends", FieldKind::List),
    FieldDef::optional("Recommends", FieldKind::List),
    FieldDef::optional("Suggests", FieldKind::List),
    FieldDef::optional("Conflicts", FieldKind::List),
    FieldDef::optional("Provides", FieldKind::List),
    FieldDef::optional("Replaces", FieldKind::List),
    FieldDef::optional("Source", FieldKind::Scalar),
];

fn built_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"building package '([^']+)' in '([^']+)'").expect("built regex is valid")
    })
}

/// Debian package format
pub struct DebFormat;

impl DebFormat {
    /// Fold the dependency map into `Depends` as `name (>= version)`
    /// clauses, mapping runtime names to their Debian package names
    fn merge_depends(properties: &Properties, dependencies: &Dependencies) -> Properties {
        if dependencies.is_empty() {
            return properties.clone();
        }
        let mut depends = match properties.get("Depends") {
            Some(PropertyValue::List(items)) => items.clone(),
            Some(PropertyValue::Scalar(s)) => vec![s.clone()],
            _ => Vec::new(),
        };
        for (name, constraint) in dependencies {
            let mapped = DEPENDENCY_PACKAGE_MAP
                .iter()
                .find(|(from, _)| from == name)
                .map_or(name.as_str(), |(_, to)| *to);
            depends.push(format!("{mapped} ({})", relation_clause(constraint)));
        }
        let mut properties = properties.clone();
        properties.insert("Depends".to_string(), PropertyValue::List(depends));
        properties
    }
}

/// Split a constraint like `>=16` into the `>= 16` relation dpkg expects.
/// A bare version gets `>=`.
fn relation_clause(constraint: &str) -> String {
    let version = constraint.trim_start_matches(['>', '<', '=', '~', '^']);
    let op = &constraint[..constraint.len() - version.len()];
    let op = match op {
        "" | "^" | "~" => ">=",
        "=" => "=",
        other => other,
    };
    format!("{op} {}", version.trim())
}

impl PackageFormat for DebFormat {
    fn name(&self) -> &'static str {
        "deb"
    }

    fn control_file(&self) -> &'static str {
        CONTROL
    }

    fn schema(&self) -> &'static [FieldDef] {
        FIELDS
    }

    fn control_transformer(
        &self,
        properties: &Properties,
        dependencies: &Dependencies,
    ) -> Transformer {
        let properties = Self::merge_depends(properties, dependencies);
        control_rewrite_transformer(
            CONTROL,
            FIELDS,
            properties,
            ControlSyntax::ColonPairs,
            Vec::new(),
        )
    }

    fn build_command(&self, staging: &Path, _properties: &Properties) -> BuildCommand {
        // dpkg-deb writes <staging>.deb next to the staging tree
        let cwd = staging.parent().unwrap_or(staging);
        let dir = staging.file_name().map_or(".".into(), |n| n.to_string_lossy().into_owned());
        BuildCommand::new("dpkg-deb", cwd).arg("--build").arg(dir)
    }

    fn parse_artifact(
        &self,
        output: &BuildOutput,
        _properties: &Properties,
        staging: &Path,
    ) -> Option<Artifact> {
        let combined = output.combined();
        let captures = built_re().captures(&combined)?;
        let id = captures[1].to_string();

        let reported = Path::new(&captures[2]);
        let path = if reported.is_absolute() {
            reported.to_path_buf()
        } else {
            staging.parent().unwrap_or(staging).join(reported)
        };
        Some(Artifact {
            id,
            path: Some(path),
        })
    }
}
