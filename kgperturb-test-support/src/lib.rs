//! Shared test utilities used across kgperturb crates.

pub mod ci;
pub mod tracing;
