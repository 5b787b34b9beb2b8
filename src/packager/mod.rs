//! Packager lifecycle
//!
//! Drives one packaging invocation through its stages:
//! Init → PrepareStaging → Gather → Transform → Materialize →
//! InvokeBuilder → ParseOutput → Publish. Format backends are values
//! implementing [`PackageFormat`], selected through [`backend_for`]; the
//! lifecycle itself is format-agnostic.

pub mod debian;
pub mod docker;
pub mod pkg;
pub mod rpm;

use futures::StreamExt;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::content::materialize::{Materializer, PathExpander};
use crate::content::merge::merge_providers;
use crate::content::transform::{TransformChain, Transformer};
use crate::content::ContentProvider;
use crate::core::context::ExpansionContext;
use crate::core::fields::{validate_properties, FieldDef, Properties};
use crate::error::{ConfigurationError, PkgforgeError, PublishError};
use crate::infra::filesystem;
use crate::infra::process::{run_build, BuildCommand, BuildOutput};

/// Dependency name to version constraint map
pub type Dependencies = BTreeMap<String, String>;

/// Opaque identifier of a successful build, plus the artifact file when
/// the format produces one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Identifier, e.g. `abc 1.0.0` or a container image id
    pub id: String,
    /// Artifact file inside the staging tree, if any
    pub path: Option<PathBuf>,
}

/// Options for one packaging invocation
#[derive(Debug, Clone)]
pub struct PackagerOptions {
    /// Mirror pipeline and builder output at info level
    pub verbose: bool,
    /// Materialize fully but never spawn the build tool or publish
    pub dry: bool,
    /// Publish target; may contain `{{key}}` placeholders
    pub publish: Option<String>,
    /// Staging directory, exclusively owned for the invocation
    pub staging: PathBuf,
    /// Install root content is remapped under; the control file stays at
    /// the staging root
    pub install_dir: Option<String>,
}

impl Default for PackagerOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            dry: false,
            publish: None,
            staging: PathBuf::from(crate::config::defaults::DEFAULT_STAGING_DIR),
            install_dir: None,
        }
    }
}

/// Capability set every format backend supplies
pub trait PackageFormat: Send + Sync {
    /// Registry name of the format
    fn name(&self) -> &'static str;

    /// Name of the generated control file within the staging tree
    fn control_file(&self) -> &'static str;

    /// Field schema driving validation and control-file rendering
    fn schema(&self) -> &'static [FieldDef];

    /// Transformer that rewrites (or synthesizes) the control file
    fn control_transformer(
        &self,
        properties: &Properties,
        dependencies: &Dependencies,
    ) -> Transformer;

    /// The external build command, staging as working directory
    fn build_command(&self, staging: &Path, properties: &Properties) -> BuildCommand;

    /// Extract the artifact identifier from the build output
    fn parse_artifact(
        &self,
        output: &BuildOutput,
        properties: &Properties,
        staging: &Path,
    ) -> Option<Artifact>;
}

/// Look up a backend by format name
pub fn backend_for(name: &str) -> Option<Box<dyn PackageFormat>> {
    match name {
        "pkg" | "arch" => Some(Box::new(pkg::PkgFormat)),
        "deb" | "debian" => Some(Box::new(debian::DebFormat)),
        "rpm" => Some(Box::new(rpm::RpmFormat)),
        "docker" | "oci" => Some(Box::new(docker::DockerFormat)),
        _ => None,
    }
}

/// One packaging invocation.
///
/// Created per run; owns the staging directory for its duration and keeps
/// no cross-invocation state.
pub struct Packager {
    backend: Box<dyn PackageFormat>,
    properties: Properties,
    dependencies: Dependencies,
    options: PackagerOptions,
}

impl fmt::Debug for Packager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packager")
            .field("format", &self.backend.name())
            .field("properties", &self.properties)
            .field("dependencies", &self.dependencies)
            .field("options", &self.options)
            .finish()
    }
}

impl Packager {
    /// Validate properties against the format schema and construct the
    /// packager. Fails before any filesystem or process work happens.
    pub fn new(
        format: &str,
        raw_properties: &Properties,
        dependencies: Dependencies,
        options: PackagerOptions,
    ) -> Result<Self, ConfigurationError> {
        let backend =
            backend_for(format).ok_or_else(|| ConfigurationError::UnknownFormat {
                name: format.to_string(),
            })?;
        let properties = validate_properties(backend.name(), backend.schema(), raw_properties)?;
        Ok(Self {
            backend,
            properties,
            dependencies,
            options,
        })
    }

    /// The validated property map
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Flat string variables derived from the validated properties, for
    /// the expansion context. Each schema field is exposed under its
    /// canonical key and, when it has one, its input alias, so a publish
    /// target can say `{{arch}}` whatever the backend calls the field.
    pub fn variables(&self) -> Vec<(String, String)> {
        let mut vars = Vec::new();
        for def in self.backend.schema() {
            if let Some(value) = self.properties.get(def.key) {
                let text = value.to_text();
                if let Some(alias) = def.alias {
                    vars.push((alias.to_string(), text.clone()));
                }
                vars.push((def.key.to_string(), text));
            }
        }
        vars
    }

    /// The staging directory of this invocation
    pub fn staging(&self) -> &Path {
        &self.options.staging
    }

    /// Run the lifecycle.
    ///
    /// Gathers all providers, runs the transformer chain (caller rules
    /// first, the backend's control transformer last), materializes into
    /// staging, invokes the build tool, and publishes when configured.
    /// Dry runs stop after materialization and return no artifact.
    /// Publish failures are logged but never unwind the successful build.
    pub async fn run(
        &self,
        providers: &[Box<dyn ContentProvider>],
        extra_transformers: Vec<Transformer>,
        modes: &[(String, u32)],
        ctx: &ExpansionContext,
    ) -> Result<Option<Artifact>, PkgforgeError> {
        let staging = &self.options.staging;
        filesystem::create_dir_all(staging)?;

        let mut transformers = extra_transformers;
        transformers.push(
            self.backend
                .control_transformer(&self.properties, &self.dependencies),
        );
        let mut chain = TransformChain::new(transformers);

        let mut materializer = Materializer::new(staging).with_modes(modes)?;
        if let Some(expander) = self.install_expander() {
            materializer = materializer.with_expander(expander);
        }

        let mut merged = merge_providers(providers, ctx);
        while let Some(entry) = merged.next().await {
            let entry = entry?;
            if let Some(entry) = chain.apply(entry).await? {
                let written = materializer.write_entry(entry).await?;
                if self.options.verbose {
                    info!("staged {}", written.display());
                }
            }
        }
        for entry in chain.finish().await? {
            let written = materializer.write_entry(entry).await?;
            if self.options.verbose {
                info!("staged {}", written.display());
            }
        }

        if self.options.dry {
            return Ok(None);
        }

        let command = self.backend.build_command(staging, &self.properties);
        let output = run_build(&command, self.options.verbose).await?;

        let artifact = self
            .backend
            .parse_artifact(&output, &self.properties, staging)
            .ok_or_else(|| crate::error::BuildToolError::NoArtifact {
                tool: command.program().to_string(),
            })?;
        info!("built {}", artifact.id);

        if let Some(target) = &self.options.publish {
            let target = ctx.expand(target);
            if let Err(e) = publish_artifact(&artifact, Path::new(&target)).await {
                warn!("publish failed (build result kept): {e}");
            }
        }

        Ok(Some(artifact))
    }

    /// Remap content under the install root, keeping the control file at
    /// the staging top level
    fn install_expander(&self) -> Option<PathExpander> {
        let install_dir = self.options.install_dir.clone()?;
        let control = PathBuf::from(self.backend.control_file());
        Some(Box::new(move |path: &Path| {
            if path == control {
                path.to_path_buf()
            } else {
                Path::new(install_dir.trim_start_matches('/')).join(path)
            }
        }))
    }
}

/// Build the control-file transformer shared by all backends: rewrite a
/// matching entry through [`rewrite_control`], and synthesize the file
/// from nothing when no source content supplied one.
pub(crate) fn control_rewrite_transformer(
    control_file: &'static str,
    schema: &'static [FieldDef],
    properties: Properties,
    syntax: crate::core::keyvalue::ControlSyntax,
    trailing: Vec<String>,
) -> Transformer {
    use futures::FutureExt;

    Transformer::for_entry_name(control_file, move |entry: crate::content::ContentEntry| {
        let properties = properties.clone();
        let trailing = trailing.clone();
        async move {
            let text = entry
                .text()
                .await
                .map_err(|e| crate::error::TransformError::Read {
                    entry: entry.name.clone(),
                    error: e.to_string(),
                })?;
            let rewritten =
                crate::core::keyvalue::rewrite_control(&text, schema, &properties, syntax, &trailing);
            Ok(crate::content::ContentEntry::from_bytes(
                entry.name.clone(),
                rewritten,
            ))
        }
        .boxed()
    })
    .create_when_missing(move || crate::content::ContentEntry::empty(control_file))
}

/// Copy the artifact file to the publish target. A target directory gets
/// the artifact's file name appended.
async fn publish_artifact(artifact: &Artifact, target: &Path) -> Result<(), PublishError> {
    let source = artifact
        .path
        .as_ref()
        .ok_or_else(|| PublishError::MissingArtifact {
            id: artifact.id.clone(),
        })?;

    let destination = if target.is_dir() {
        match source.file_name() {
            Some(name) => target.join(name),
            None => target.to_path_buf(),
        }
    } else {
        target.to_path_buf()
    };

    tokio::fs::copy(source, &destination)
        .await
        .map_err(|e| PublishError::Copy {
            from: source.clone(),
            to: destination.clone(),
            error: e.to_string(),
        })?;
    info!("published {} to {}", artifact.id, destination.display());
    Ok(())
}
