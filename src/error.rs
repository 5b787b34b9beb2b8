//! Error types for pkgforge
//!
//! Domain-specific error types using thiserror, one enum per lifecycle
//! stage so failures always carry the stage they happened in.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors, detected before any filesystem or process work
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Mandatory property missing with no default
    #[error("Mandatory field '{field}' missing for format '{format}' and has no default")]
    MissingMandatoryField { format: String, field: String },

    /// Property value does not fit the schema kind
    #[error("Field '{field}' has invalid value: expected {expected}, got {got}")]
    InvalidFieldValue {
        field: String,
        expected: String,
        got: String,
    },

    /// Requested output format is not registered
    #[error("Unknown package format '{name}'")]
    UnknownFormat { name: String },

    /// Mode override value is not valid octal
    #[error("Invalid file mode '{value}' for pattern '{pattern}'")]
    InvalidMode { pattern: String, value: String },

    /// Mode override pattern did not parse
    #[error("Invalid mode pattern '{pattern}': {error}")]
    InvalidModePattern { pattern: String, error: String },

    /// Manifest could not be read or parsed
    #[error("Failed to load manifest '{path}': {error}")]
    Manifest { path: PathBuf, error: String },

    /// No manifest found in the package directory
    #[error("No package.toml or package.json found in '{path}'")]
    ManifestNotFound { path: PathBuf },
}

/// Content provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Base directory cannot be read
    #[error("Source directory unreadable '{path}': {error}")]
    BaseDirUnreadable { path: PathBuf, error: String },

    /// Glob pattern did not parse
    #[error("Invalid content pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    /// Archive cannot be opened or iterated
    #[error("Archive unreadable '{path}': {error}")]
    ArchiveUnreadable { path: PathBuf, error: String },

    /// IO error while enumerating or reading content
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Transformer errors, surfaced with the entry name for diagnosis
#[derive(Error, Debug)]
pub enum TransformError {
    /// Entry content could not be read
    #[error("Failed to read entry '{entry}': {error}")]
    Read { entry: String, error: String },
}

/// Staging materialization errors
#[derive(Error, Debug)]
pub enum MaterializationError {
    /// Failed to create a destination directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to write a destination file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to apply a file mode
    #[error("Failed to set mode {mode:o} on '{path}': {error}")]
    SetMode {
        path: PathBuf,
        mode: u32,
        error: String,
    },

    /// Entry source could not be opened for copying
    #[error("Failed to read source for entry '{entry}': {error}")]
    ReadSource { entry: String, error: String },
}

/// External build tool errors
#[derive(Error, Debug)]
pub enum BuildToolError {
    /// Build tool is not installed
    #[error("Build tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },

    /// Build tool could not be spawned
    #[error("Failed to spawn '{tool}': {error}")]
    Spawn { tool: String, error: String },

    /// Build tool exited non-zero; the staging tree is left intact
    #[error("'{tool}' exited with code {code}:\n{output_tail}")]
    Failed {
        tool: String,
        code: i32,
        output_tail: String,
    },

    /// Build tool succeeded but no artifact identifier was found
    #[error("'{tool}' produced no recognizable artifact identifier")]
    NoArtifact { tool: String },
}

/// Publish errors; reported but never unwind a successful build
#[derive(Error, Debug)]
pub enum PublishError {
    /// Artifact has no file to copy
    #[error("Artifact '{id}' has no file to publish")]
    MissingArtifact { id: String },

    /// Copy to the publish target failed
    #[error("Failed to publish '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Top-level pkgforge error type
#[derive(Error, Debug)]
pub enum PkgforgeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Provider error (Gather stage)
    #[error("Gather failed: {0}")]
    Provider(#[from] ProviderError),

    /// Transform error (Transform stage)
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    /// Materialization error (Materialize stage)
    #[error("Materialize failed: {0}")]
    Materialization(#[from] MaterializationError),

    /// Build tool error (InvokeBuilder stage)
    #[error("Build failed: {0}")]
    BuildTool(#[from] BuildToolError),

    /// Publish error (Publish stage)
    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),
}
