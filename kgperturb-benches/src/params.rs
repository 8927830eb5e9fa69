//! Benchmark parameter types.

use std::fmt;

/// Parameters for a perturbation benchmark run.
#[derive(Clone, Debug)]
pub struct PerturbBenchParams {
    /// Entities in the input graph.
    pub entity_count: usize,
    /// Count passed to each of the four structural operators.
    pub edits: usize,
}

impl fmt::Display for PerturbBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},edits={}", self.entity_count, self.edits)
    }
}

/// Parameters for an alignment benchmark run.
#[derive(Clone, Debug)]
pub struct AlignmentBenchParams {
    /// Entities in the input graph.
    pub entity_count: usize,
}

impl fmt::Display for AlignmentBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={}", self.entity_count)
    }
}
