//! Container image backend
//!
//! Generates a Dockerfile with `LABEL key="value"` metadata lines plus
//! trailing `FROM` lines derived from the dependency map, then drives
//! `docker build`. The artifact identifier is the last line of the build
//! output; there is no artifact file to publish.

use std::path::Path;

use crate::config::defaults::DEPENDENCY_IMAGE_MAP;
use crate::content::transform::Transformer;
use crate::core::fields::{FieldDef, FieldKind, Properties, PropertyValue};
use crate::core::keyvalue::ControlSyntax;
use crate::infra::process::{BuildCommand, BuildOutput};
use crate::packager::{control_rewrite_transformer, Artifact, Dependencies, PackageFormat};

const DOCKERFILE: &str = "Dockerfile";

/// Dockerfile label fields
static FIELDS: &[FieldDef] = &[
    FieldDef {
        key: "version",
        alias: None,
        kind: FieldKind::Scalar,
        mandatory: true,
        default: None,
    },
    FieldDef::optional("description", FieldKind::Scalar),
    FieldDef {
        key: "maintainer",
        alias: Some("author"),
        kind: FieldKind::Scalar,
        mandatory: false,
        default: None,
    },
    FieldDef::optional("license", FieldKind::Scalar),
];

/// Container image format
pub struct DockerFormat;

impl DockerFormat {
    /// Trailing Dockerfile lines: base images from the dependency map and
    /// the explicit `from`/`entrypoint` properties
    fn trailing_lines(properties: &Properties, dependencies: &Dependencies) -> Vec<String> {
        let mut lines = Vec::new();

        for (name, constraint) in dependencies {
            let Some((_, image)) = DEPENDENCY_IMAGE_MAP.iter().find(|(from, _)| from == name)
            else {
                continue;
            };
            let tag = constraint.trim_start_matches(['>', '=', '<', '~', '^']);
            lines.push(String::new());
            lines.push(format!("FROM {image}:{tag}"));
        }

        if let Some(PropertyValue::Scalar(from)) = properties.get("from") {
            lines.push(String::new());
            lines.push(format!("FROM {from}"));
        }
        if let Some(PropertyValue::Scalar(entrypoint)) = properties.get("entrypoint") {
            lines.push(format!("ENTRYPOINT [\"{entrypoint}\"]"));
        }

        lines
    }
}

impl PackageFormat for DockerFormat {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn control_file(&self) -> &'static str {
        DOCKERFILE
    }

    fn schema(&self) -> &'static [FieldDef] {
        FIELDS
    }

    fn control_transformer(
        &self,
        properties: &Properties,
        dependencies: &Dependencies,
    ) -> Transformer {
        let trailing = Self::trailing_lines(properties, dependencies);
        control_rewrite_transformer(
            DOCKERFILE,
            FIELDS,
            properties.clone(),
            ControlSyntax::DockerLabel,
            trailing,
        )
    }

    fn build_command(&self, staging: &Path, _properties: &Properties) -> BuildCommand {
        BuildCommand::new("docker", staging).arg("build").arg(".")
    }

    fn parse_artifact(
        &self,
        output: &BuildOutput,
        _properties: &Properties,
        _staging: &Path,
    ) -> Option<Artifact> {
        let id = output
            .stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())?
            .to_string();
        Some(Artifact { id, path: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::transform::TransformChain;
    use crate::core::fields::validate_properties;

    fn props() -> Properties {
        let raw: Properties = [
            ("name", "abc"),
            ("version", "1.0.0"),
            ("description", "a description"),
            ("license", "MIT"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), PropertyValue::Scalar(v.to_string())))
        .collect();
        validate_properties("docker", FIELDS, &raw).unwrap()
    }

    #[tokio::test]
    async fn test_synthesized_dockerfile_labels_and_from() {
        let format = DockerFormat;
        let deps: Dependencies = [("node".to_string(), "lts-slim".to_string())].into();
        let mut chain = TransformChain::new(vec![format.control_transformer(&props(), &deps)]);

        let synthesized = chain.finish().await.unwrap();
        assert_eq!(synthesized.len(), 1);
        assert_eq!(synthesized[0].name, DOCKERFILE);
        let text = synthesized[0].text().await.unwrap();
        assert!(text.contains("LABEL version=\"1.0.0\""));
        assert!(text.contains("LABEL description=\"a description\""));
        assert!(text.contains("FROM node:lts-slim"));
    }

    #[test]
    fn test_version_constraint_stripped_for_image_tag() {
        let deps: Dependencies = [("nginx".to_string(), ">=1.25".to_string())].into();
        let lines = DockerFormat::trailing_lines(&props(), &deps);
        assert!(lines.contains(&"FROM nginx:1.25".to_string()));
    }

    #[test]
    fn test_unmapped_dependency_produces_no_from_line() {
        let deps: Dependencies = [("openssl".to_string(), "3".to_string())].into();
        let lines = DockerFormat::trailing_lines(&props(), &deps);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_artifact_is_last_output_line() {
        let format = DockerFormat;
        let output = BuildOutput {
            stdout: "Step 1/3 : FROM node:20\nSuccessfully built 3fa9c2d1\nsha256:3fa9c2d1\n\n"
                .to_string(),
            stderr: String::new(),
        };
        let artifact = format
            .parse_artifact(&output, &props(), Path::new("/tmp"))
            .unwrap();
        assert_eq!(artifact.id, "sha256:3fa9c2d1");
        assert!(artifact.path.is_none());
    }

    #[test]
    fn test_empty_output_yields_no_artifact() {
        let format = DockerFormat;
        let output = BuildOutput {
            stdout: "\n".to_string(),
            stderr: String::new(),
        };
        assert!(format
            .parse_artifact(&output, &props(), Path::new("/tmp"))
            .is_none());
    }
}
