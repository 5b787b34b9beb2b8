//! Pkgforge - assemble OS and container packages from a package directory
//!
//! This library turns a directory described by a package.toml (or an npm
//! package.json) into a native package: Arch pkg, Debian deb, RPM, or a
//! container image. Content flows through a streaming pipeline of
//! providers, transformers, and a staging materializer before the
//! format's own build tool is invoked.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`content`] - Content providers, transformer chain, materializer
//! - [`packager`] - Packaging lifecycle and format backends
//! - [`core`] - Manifest, field schemas, control-file rewriting
//! - [`infra`] - Infrastructure layer (filesystem, processes)
//! - [`config`] - Constants and built-in defaults
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod content;
pub mod core;
pub mod error;
pub mod infra;
pub mod packager;
