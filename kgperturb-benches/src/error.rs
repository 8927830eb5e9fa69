//! Benchmark setup error type.

use kgperturb_alignment::AlignmentError;
use kgperturb_core::PerturbError;

use crate::source::SyntheticGraphError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic graph generation failed.
    #[error("synthetic graph generation failed: {0}")]
    Synthetic(#[from] SyntheticGraphError),
    /// Building or running the perturbator failed.
    #[error("perturbation failed: {0}")]
    Perturb(#[from] PerturbError),
    /// Building the alignment tables failed.
    #[error("alignment failed: {0}")]
    Alignment(#[from] AlignmentError),
}
