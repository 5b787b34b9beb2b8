//! Infrastructure layer
//!
//! Filesystem and process I/O. No packaging semantics live here.

pub mod filesystem;
pub mod process;
