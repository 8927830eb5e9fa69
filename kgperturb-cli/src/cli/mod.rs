//! Command-line interface orchestration for kgperturb.
//!
//! `perturb` and `perturb-and-align` read a JSON graph, run the configured
//! perturbation and write the result; the latter also exports entity-alignment
//! files. `strip` simplifies source-annotated extraction output.

mod commands;

pub use commands::{
    AlignArgs, Cli, CliError, Command, DEFAULT_ALIGNMENT_DIR, ExecutionSummary, PerturbArgs,
    PerturbSummary, RunArgs, StripArgs, render_summary, run_cli,
};
