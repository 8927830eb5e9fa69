//! Benchmark support crate for kgperturb.
//!
//! Provides seeded synthetic knowledge graphs and parameter types used by the
//! Criterion benchmarks of the perturbation pipeline and the alignment
//! emitter.

pub mod error;
pub mod params;
pub mod source;
