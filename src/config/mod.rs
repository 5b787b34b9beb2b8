//! Configuration and constants
//!
//! Data tables consumed by the pipeline: nothing in here executes I/O.

pub mod defaults;
