//! Support library for the `kgperturb` binary.
//!
//! Exposes the command pipeline, configuration loading and logging setup so
//! doctests and integration tests can drive commands without a subprocess.

pub mod cli;
pub mod config;
pub mod logging;
