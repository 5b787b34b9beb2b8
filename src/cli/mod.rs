//! Command-line interface module
//!
//! Argument parsing and output formatting. The CLI only wires the
//! manifest, content providers, and packager together - packaging
//! semantics live in [`crate::packager`] and [`crate::content`].

pub mod output;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::defaults::{DEFAULT_CONTENT_PATTERN, DEFAULT_STAGING_DIR, PRUNE_PATTERNS};
use crate::content::filesystem::FileContentProvider;
use crate::content::node_modules::NodeModulesProvider;
use crate::content::npm_pack::NpmPackProvider;
use crate::content::ContentProvider;
use crate::core::context::ExpansionContext;
use crate::core::manifest::PackageManifest;
use crate::packager::{backend_for, Packager, PackagerOptions};

/// Pipeline stages an invocation runs through
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    /// Gather, transform, and materialize into staging, then stop
    Content,
    /// Full lifecycle including the build tool and publishing
    Build,
}

/// Pkgforge - assemble OS and container packages from a package directory
///
/// Reads package.toml (or npm package.json), gathers content through the
/// configured providers, and drives the native build tool of the chosen
/// output format.
#[derive(Parser, Debug)]
#[command(name = "pkgforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Package directory containing package.toml or package.json
    #[arg(short, long, default_value = ".")]
    pub package: PathBuf,

    /// Output format: pkg, deb, rpm, or docker
    #[arg(short, long)]
    pub format: String,

    /// Staging directory the content is materialized into
    #[arg(long, default_value = DEFAULT_STAGING_DIR)]
    pub staging: PathBuf,

    /// Install root the package content is placed under
    #[arg(long)]
    pub install_dir: Option<String>,

    /// npm pack tarball to gather content from
    #[arg(long)]
    pub npm_pack: Option<PathBuf>,

    /// Publish target; overrides the manifest's
    #[arg(long)]
    pub publish: Option<String>,

    /// Materialize fully but never run the build tool
    #[arg(long)]
    pub dry: bool,

    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Stages to run; `content` stops after materialization
    #[arg(value_enum, default_value = "build")]
    pub stages: Vec<Stage>,
}

impl Cli {
    /// Execute one packaging invocation
    pub async fn run(self) -> Result<()> {
        let backend = backend_for(&self.format)
            .with_context(|| format!("Unknown package format '{}'", self.format))?;
        let format = backend.name();

        let manifest = PackageManifest::load(&self.package)?;
        let raw_properties = manifest.properties_for(format);
        let modes = manifest.mode_table()?;

        let verbose = self.verbose > 0;
        let dry = self.dry || !self.stages.contains(&Stage::Build);
        let options = PackagerOptions {
            verbose,
            dry,
            publish: self.publish.clone().or_else(|| manifest.publish.clone()),
            staging: self.staging.clone(),
            install_dir: self.install_dir.clone(),
        };

        let packager = Packager::new(format, &raw_properties, manifest.dependencies.clone(), options)?;

        // validated properties (e.g. the resolved arch) are visible to
        // placeholder expansion in patterns and publish targets
        let ctx = ExpansionContext::new(&self.package)
            .with_vars(manifest.variables())
            .with_vars(packager.variables())
            .with_var("format", format);

        let providers = self.content_providers(&manifest, &self.package);

        let spinner = (!verbose).then(|| output::create_spinner("packaging"));
        let result = packager.run(&providers, Vec::new(), &modes, &ctx).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        match result? {
            Some(artifact) => {
                println!("{} built {}", output::status::SUCCESS, artifact.id);
            }
            None => {
                println!(
                    "{} staged content in {}",
                    output::status::SUCCESS,
                    packager.staging().display()
                );
            }
        }
        Ok(())
    }

    /// Providers for this invocation: the manifest's content mappings (or
    /// the whole package directory when none are given), the node_modules
    /// closure when present, and an optional npm pack tarball
    fn content_providers(
        &self,
        manifest: &PackageManifest,
        dir: &Path,
    ) -> Vec<Box<dyn ContentProvider>> {
        let mut providers: Vec<Box<dyn ContentProvider>> = Vec::new();

        if manifest.content.is_empty() {
            providers.push(Box::new(FileContentProvider::from_pattern(
                DEFAULT_CONTENT_PATTERN,
            )));
        } else {
            providers.push(Box::new(FileContentProvider::new(manifest.content.clone())));
        }

        let node_modules = dir.join("node_modules");
        if node_modules.is_dir() {
            providers.push(Box::new(NodeModulesProvider::new(
                node_modules,
                PRUNE_PATTERNS,
            )));
        }

        if let Some(archive) = &self.npm_pack {
            providers.push(Box::new(NpmPackProvider::new(archive)));
        }

        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_invocation() {
        let cli = Cli::try_parse_from(["pkgforge", "--format", "docker"]).unwrap();
        assert_eq!(cli.format, "docker");
        assert_eq!(cli.package, PathBuf::from("."));
        assert_eq!(cli.staging, PathBuf::from(DEFAULT_STAGING_DIR));
        assert_eq!(cli.stages, vec![Stage::Build]);
        assert!(!cli.dry);
    }

    #[test]
    fn test_parse_content_stage_and_options() {
        let cli = Cli::try_parse_from([
            "pkgforge",
            "--format",
            "deb",
            "--install-dir",
            "/opt/abc",
            "--staging",
            "out",
            "content",
        ])
        .unwrap();
        assert_eq!(cli.stages, vec![Stage::Content]);
        assert_eq!(cli.install_dir.as_deref(), Some("/opt/abc"));
        assert_eq!(cli.staging, PathBuf::from("out"));
    }

    #[test]
    fn test_format_is_required() {
        assert!(Cli::try_parse_from(["pkgforge"]).is_err());
    }

    #[test]
    fn test_unknown_stage_rejected() {
        assert!(Cli::try_parse_from(["pkgforge", "--format", "rpm", "deploy"]).is_err());
    }
}
