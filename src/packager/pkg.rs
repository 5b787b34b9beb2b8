//! Arch package backend
//!
//! Generates a PKGBUILD and drives `makepkg`. The field table mirrors the
//! well-known PKGBUILD properties; see
//! <https://wiki.archlinux.org/title/PKGBUILD>.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::config::defaults::DEPENDENCY_PACKAGE_MAP;
use crate::content::transform::Transformer;
use crate::core::fields::{DefaultValue, FieldDef, FieldKind, Properties, PropertyValue};
use crate::core::keyvalue::ControlSyntax;
use crate::infra::process::{BuildCommand, BuildOutput};
use crate::packager::{control_rewrite_transformer, Artifact, Dependencies, PackageFormat};

const PKGBUILD: &str = "PKGBUILD";

/// Well-known PKGBUILD fields
static FIELDS: &[FieldDef] = &[
    FieldDef {
        key: "pkgname",
        alias: Some("name"),
        kind: FieldKind::List,
        mandatory: true,
        default: None,
    },
    FieldDef {
        key: "pkgver",
        alias: Some("version"),
        kind: FieldKind::Scalar,
        mandatory: true,
        default: None,
    },
    FieldDef {
        key: "pkgrel",
        alias: Some("release"),
        kind: FieldKind::Integer,
        mandatory: true,
        default: Some(DefaultValue::Int(0)),
    },
    FieldDef {
        key: "pkgdesc",
        alias: Some("description"),
        kind: FieldKind::Scalar,
        mandatory: true,
        default: None,
    },
    FieldDef {
        key: "arch",
        alias: None,
        kind: FieldKind::List,
        mandatory: true,
        default: Some(DefaultValue::StrList(&["any"])),
    },
    FieldDef {
        key: "license",
        alias: None,
        kind: FieldKind::List,
        mandatory: true,
        default: None,
    },
    FieldDef {
        key: "md5sums",
        alias: None,
        kind: FieldKind::List,
        mandatory: true,
        default: Some(DefaultValue::StrList(&["SKIP"])),
    },
    FieldDef {
        key: "url",
        alias: Some("homepage"),
        kind: FieldKind::Scalar,
        mandatory: false,
        default: None,
    },
    FieldDef::optional("epoch", FieldKind::Integer),
    FieldDef::optional("install", FieldKind::Scalar),
    FieldDef::optional("changelog", FieldKind::Scalar),
    FieldDef::optional("source", FieldKind::List),
    FieldDef::optional("validpgpkeys", FieldKind::List),
    FieldDef::optional("noextract", FieldKind::List),
    FieldDef::optional("sha1sums", FieldKind::List),
    FieldDef::optional("sha256sums", FieldKind::List),
    FieldDef::optional("sha384sums", FieldKind::List),
    FieldDef::optional("sha512sums", FieldKind::List),
    FieldDef::optional("groups", FieldKind::List),
    FieldDef::optional("backup", FieldKind::List),
    FieldDef::optional("depends", FieldKind::List),
    FieldDef::optional("makedepends", FieldKind::List),
    FieldDef::optional("checkdepends", FieldKind::List),
    FieldDef::optional("optdepends", FieldKind::List),
    FieldDef::optional("conflicts", FieldKind::List),
    FieldDef::optional("provides", FieldKind::List),
    FieldDef::optional("replaces", FieldKind::List),
    FieldDef::optional("options", FieldKind::List),
];

fn finished_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Finished making:\s+(\S+)\s+(\S+)").expect("finished regex is valid")
    })
}

/// Arch package format
pub struct PkgFormat;

impl PkgFormat {
    /// Fold the dependency map into the `depends` list, mapping runtime
    /// names to their Arch package names
    fn merge_depends(properties: &Properties, dependencies: &Dependencies) -> Properties {
        if dependencies.is_empty() {
            return properties.clone();
        }
        let mut depends = match properties.get("depends") {
            Some(PropertyValue::List(items)) => items.clone(),
            Some(PropertyValue::Scalar(s)) => vec![s.clone()],
            _ => Vec::new(),
        };
        for (name, constraint) in dependencies {
            let mapped = DEPENDENCY_PACKAGE_MAP
                .iter()
                .find(|(from, _)| from == name)
                .map_or(name.as_str(), |(_, to)| *to);
            depends.push(format!("{mapped}{constraint}"));
        }
        let mut properties = properties.clone();
        properties.insert("depends".to_string(), PropertyValue::List(depends));
        properties
    }
}

impl PackageFormat for PkgFormat {
    fn name(&self) -> &'static str {
        "pkg"
    }

    fn control_file(&self) -> &'static str {
        PKGBUILD
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
        // a PKGBUILD synthesized from nothing still needs a package()
        let trailing = vec![
            String::new(),
            "package() {".to_string(),
            "  cp -r \"$srcdir\"/* \"$pkgdir\"".to_string(),
            "}".to_string(),
        ];
        control_rewrite_transformer(
            PKGBUILD,
            FIELDS,
            properties,
            ControlSyntax::ShellAssign,
            trailing,
        )
    }

    fn build_command(&self, staging: &Path, _properties: &Properties) -> BuildCommand {
        BuildCommand::new("makepkg", staging).arg("-f")
    }

    fn parse_artifact(
        &self,
        output: &BuildOutput,
        _properties: &Properties,
        staging: &Path,
    ) -> Option<Artifact> {
        let combined = output.combined();
        let captures = finished_re().captures(&combined)?;
        let id = format!("{} {}", &captures[1], &captures[2]);

        let pattern = staging.join("*.pkg.tar.*").to_string_lossy().into_owned();
        let path = glob::glob(&pattern)
            .ok()
            .and_then(|mut paths| paths.next())
            .and_then(Result::ok);
        Some(Artifact { id, path })
    }
}
