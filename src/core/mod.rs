//! Core packaging logic module
//!
//! This module contains the packaging domain logic. It has NO process or
//! network I/O - that belongs in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`manifest`] - Manifest (package.toml / package.json) parsing
//! - [`fields`] - Control-file field schemas and property validation
//! - [`keyvalue`] - Control-file key/value rewriting
//! - [`context`] - Variable expansion context

pub mod context;
pub mod fields;
pub mod keyvalue;
pub mod manifest;
