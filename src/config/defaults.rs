//! Default configuration values and data tables
//!
//! Ordered pattern lists and name mappings used by providers and backends.
//! These are data, not behavior: the pipeline receives them as arguments.

/// Default staging directory, relative to the working directory
pub const DEFAULT_STAGING_DIR: &str = "build";

/// Default glob pattern for `{base}` content mappings without a pattern
pub const DEFAULT_CONTENT_PATTERN: &str = "**/*";

/// Leading archive component stripped from npm pack tarball members
pub const NPM_PACK_PREFIX: &str = "package/";

/// Ordered exclusion patterns for dependency-tree pruning.
///
/// Matched against slash-separated entry names; a match anywhere in the
/// tree drops the entry. Derived from the junk files npm packages ship.
pub const PRUNE_PATTERNS: &[&str] = &[
    "**/*~",
    "**/*.orig",
    "**/*.tmp",
    "**/*.bat",
    "**/*.mk",
    "**/*.patch",
    "**/*.d.ts",
    "**/.bin/**",
    "**/test/**",
    "**/tests/**",
    "**/example/**",
    "**/examples/**",
    "**/doc/**",
    "**/docs/**",
    "**/README*",
    "**/readme*",
    "**/CHANGELOG*",
    "**/CHANGES*",
    "**/CONTRIBUTING*",
    "**/AUTHORS*",
    "**/NOTICE*",
    "**/HISTORY*",
    "**/GOVERNANCE.md",
    "**/SECURITY.md",
    "**/CODE_OF_CONDUCT.md",
    "**/Makefile*",
    "**/Gruntfile.js",
    "**/rollup.config.*",
    "**/jsdoc.json",
    "**/yarn.lock",
    "**/binding.gyp",
    "**/config.gypi",
    "**/.git*",
    "**/.npm*",
    "**/.esl*",
    "**/.jshintrc*",
    "**/.travis.yml",
    "**/appveyor.yml",
    "**/.editorconfig",
    "**/.nvmrc",
    "**/.verb.md",
    "**/.zuul.yml",
    "**/.doclets.yml",
    "**/.tern-project",
    "**/.dockerignore",
    "**/.dir-locals.el",
];

/// Dependency name to base image mapping for container builds
pub const DEPENDENCY_IMAGE_MAP: &[(&str, &str)] = &[
    ("node", "node"),
    ("nginx-mainline", "nginx"),
    ("nginx", "nginx"),
];

/// Dependency name to system package mapping for OS package builds
pub const DEPENDENCY_PACKAGE_MAP: &[(&str, &str)] = &[("node", "nodejs")];

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
