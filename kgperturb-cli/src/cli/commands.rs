//! Command implementations and argument parsing for the kgperturb CLI.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use kgperturb_alignment::{AlignmentError, AlignmentSummary, write_alignment_files};
use kgperturb_core::{
    ContentReport, KnowledgeGraph, PerturbError, PerturbationOutcome, Perturbator, TextRewriter,
};
use kgperturb_providers_json::{
    IdScheme, JsonGraphError, read_graph_path, simplify_path, write_graph_path, write_mapping_path,
};
use kgperturb_providers_llm::{LlmError, build_rewriter};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use crate::config::{ConfigError, LlmConfig, PerturbConfig};

/// Directory created next to the output graph when `--output-dir` is absent.
pub const DEFAULT_ALIGNMENT_DIR: &str = "entity_alignment_files";

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "kgperturb",
    about = "Perturb knowledge graphs and export entity-alignment files."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Perturb a knowledge graph and write the result.
    Perturb(PerturbArgs),
    /// Perturb a knowledge graph, then write entity-alignment files.
    PerturbAndAlign(AlignArgs),
    /// Strip extraction provenance from a graph document.
    Strip(StripArgs),
}

/// Inputs shared by the perturbing commands.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Perturbation configuration (TOML, or YAML for `.yaml`/`.yml` files).
    pub config: PathBuf,
    /// Knowledge graph to perturb (JSON).
    pub input_kg: PathBuf,
    /// Destination of the perturbed graph (JSON).
    pub output_kg: PathBuf,
    /// Text-rewriting backend configuration (TOML or YAML).
    #[arg(long = "llm-config")]
    pub llm_config: Option<PathBuf>,
}

/// Options accepted by the `perturb` command.
#[derive(Debug, Args, Clone)]
pub struct PerturbArgs {
    /// Graph and configuration paths.
    #[command(flatten)]
    pub run: RunArgs,
    /// Where to save the original-to-new identifier mapping (JSON).
    #[arg(long)]
    pub mapping: Option<PathBuf>,
}

/// Options accepted by the `perturb-and-align` command.
#[derive(Debug, Args, Clone)]
pub struct AlignArgs {
    /// Graph and configuration paths.
    #[command(flatten)]
    pub run: RunArgs,
    /// Directory for the alignment files; defaults to
    /// `entity_alignment_files` next to the output graph.
    #[arg(long = "output-dir")]
    pub output_dir: Option<PathBuf>,
}

/// Options accepted by the `strip` command.
#[derive(Debug, Args, Clone)]
pub struct StripArgs {
    /// Source-annotated graph document.
    pub input: PathBuf,
    /// Destination of the simplified document.
    pub output: PathBuf,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Reading or writing graph JSON failed.
    #[error(transparent)]
    Json(#[from] JsonGraphError),
    /// The text-rewriting backend could not be set up.
    #[error(transparent)]
    Llm(#[from] LlmError),
    /// Core orchestration failed.
    #[error(transparent)]
    Core(#[from] PerturbError),
    /// Writing the alignment files failed.
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
}

/// Outcome of a perturbing command.
#[derive(Debug, Clone)]
pub struct PerturbSummary {
    /// Graph that was read.
    pub input: PathBuf,
    /// Graph that was written.
    pub output: PathBuf,
    /// Mapping file, when one was requested.
    pub mapping: Option<PathBuf>,
    /// Entities in the input graph.
    pub input_entities: usize,
    /// Relations in the input graph.
    pub input_relations: usize,
    /// Entities in the perturbed graph.
    pub output_entities: usize,
    /// Relations in the perturbed graph.
    pub output_relations: usize,
    /// Entities dropped by the remove-entities operator.
    pub removed_entities: usize,
    /// Synthetic entities added.
    pub added_entities: usize,
    /// Relations dropped by the remove-edges operator.
    pub removed_relations: usize,
    /// Relations dropped along with a removed entity.
    pub cascaded_relations: usize,
    /// Synthetic relations added.
    pub added_relations: usize,
    /// Entities carried over under a new identifier.
    pub mapped_entities: usize,
    /// Content pass counters.
    pub content: ContentReport,
    /// Alignment export, for `perturb-and-align`.
    pub alignment: Option<AlignmentSummary>,
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub enum ExecutionSummary {
    /// A graph was perturbed.
    Perturbed(Box<PerturbSummary>),
    /// A document was simplified.
    Stripped {
        /// Document that was read.
        input: PathBuf,
        /// Document that was written.
        output: PathBuf,
    },
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading, perturbing or writing fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use kgperturb_cli::cli::{Cli, Command, ExecutionSummary, StripArgs, run_cli};
/// # use tempfile::TempDir;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let dir = TempDir::new()?;
/// let input = dir.path().join("raw.json");
/// std::fs::write(&input, r#"{"entities": [], "relationships": []}"#)?;
/// let cli = Cli {
///     command: Command::Strip(StripArgs {
///         input,
///         output: dir.path().join("clean.json"),
///     }),
/// };
/// let summary = run_cli(cli)?;
/// assert!(matches!(summary, ExecutionSummary::Stripped { .. }));
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    match cli.command {
        Command::Perturb(args) => {
            span.record("command", field::display("perturb"));
            run_perturb(args).map(|summary| ExecutionSummary::Perturbed(Box::new(summary)))
        }
        Command::PerturbAndAlign(args) => {
            span.record("command", field::display("perturb-and-align"));
            run_perturb_and_align(args)
                .map(|summary| ExecutionSummary::Perturbed(Box::new(summary)))
        }
        Command::Strip(args) => {
            span.record("command", field::display("strip"));
            run_strip(args)
        }
    }
}

/// Perturbator and optional rewriter built from the configuration files.
struct Prepared {
    perturbator: Perturbator,
    rewriter: Option<Box<dyn TextRewriter>>,
}

#[instrument(
    name = "cli.prepare",
    err,
    skip(run),
    fields(config = %run.config.display(), rewriter = field::Empty),
)]
fn prepare(run: &RunArgs) -> Result<Prepared, CliError> {
    let config = PerturbConfig::load(&run.config)?;
    let llm = LlmConfig::load_or_default(run.llm_config.as_deref())?;
    let perturbator = config
        .builder()
        .with_description_policy(llm.description_policy())
        .build()?;
    let rewriter = if config.needs_rewriter() {
        let backend = build_rewriter(&llm.settings())?;
        Span::current().record("rewriter", field::display(backend.name()));
        Some(backend)
    } else {
        None
    };
    Ok(Prepared {
        perturbator,
        rewriter,
    })
}

fn perturb_loaded(
    prepared: &Prepared,
    graph: KnowledgeGraph,
    output: &Path,
) -> Result<PerturbationOutcome, CliError> {
    let outcome = prepared
        .perturbator
        .perturb(graph, prepared.rewriter.as_deref())?;
    write_graph_path(&outcome.graph, output)?;
    Ok(outcome)
}

/// Entity and relation counts of the graph that was read.
#[derive(Clone, Copy)]
struct InputSize {
    entities: usize,
    relations: usize,
}

impl InputSize {
    fn of(graph: &KnowledgeGraph) -> Self {
        Self {
            entities: graph.entity_count(),
            relations: graph.relation_count(),
        }
    }
}

fn summarise(run: &RunArgs, input: InputSize, outcome: &PerturbationOutcome) -> PerturbSummary {
    PerturbSummary {
        input: run.input_kg.clone(),
        output: run.output_kg.clone(),
        mapping: None,
        input_entities: input.entities,
        input_relations: input.relations,
        output_entities: outcome.graph.entity_count(),
        output_relations: outcome.graph.relation_count(),
        removed_entities: outcome.removed_entities.len(),
        added_entities: outcome.added_entities.len(),
        removed_relations: outcome.removed_relations,
        cascaded_relations: outcome.cascaded_relations,
        added_relations: outcome.added_relations,
        mapped_entities: outcome.mapping.len(),
        content: outcome.content,
        alignment: None,
    }
}

#[instrument(
    name = "cli.perturb",
    err,
    skip(args),
    fields(input = %args.run.input_kg.display(), output = %args.run.output_kg.display()),
)]
pub(super) fn run_perturb(args: PerturbArgs) -> Result<PerturbSummary, CliError> {
    let prepared = prepare(&args.run)?;
    let original = read_graph_path(&args.run.input_kg, IdScheme::Original)?;
    let input = InputSize::of(&original);
    let outcome = perturb_loaded(&prepared, original, &args.run.output_kg)?;
    if let Some(path) = &args.mapping {
        write_mapping_path(&outcome.mapping, path)?;
    }

    let summary = PerturbSummary {
        mapping: args.mapping.clone(),
        ..summarise(&args.run, input, &outcome)
    };
    info!(
        entities = summary.output_entities,
        relations = summary.output_relations,
        "command completed"
    );
    Ok(summary)
}

#[instrument(
    name = "cli.perturb_and_align",
    err,
    skip(args),
    fields(
        input = %args.run.input_kg.display(),
        output = %args.run.output_kg.display(),
        output_dir = field::Empty,
    ),
)]
pub(super) fn run_perturb_and_align(args: AlignArgs) -> Result<PerturbSummary, CliError> {
    let prepared = prepare(&args.run)?;
    let original = read_graph_path(&args.run.input_kg, IdScheme::Original)?;
    let outcome = perturb_loaded(&prepared, original.clone(), &args.run.output_kg)?;

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| default_alignment_dir(&args.run.output_kg));
    Span::current().record("output_dir", field::display(output_dir.display()));
    let alignment =
        write_alignment_files(&original, &outcome.graph, &outcome.mapping, &output_dir)?;

    let summary = PerturbSummary {
        alignment: Some(alignment),
        ..summarise(&args.run, InputSize::of(&original), &outcome)
    };
    info!(
        entities = summary.output_entities,
        relations = summary.output_relations,
        output_dir = %output_dir.display(),
        "command completed"
    );
    Ok(summary)
}

#[instrument(
    name = "cli.strip",
    err,
    skip(args),
    fields(input = %args.input.display(), output = %args.output.display()),
)]
pub(super) fn run_strip(args: StripArgs) -> Result<ExecutionSummary, CliError> {
    simplify_path(&args.input, &args.output)?;
    info!("command completed");
    Ok(ExecutionSummary::Stripped {
        input: args.input,
        output: args.output,
    })
}

/// Alignment directory used when none is given: a sibling of `output_kg`.
pub(super) fn default_alignment_dir(output_kg: &Path) -> PathBuf {
    output_kg
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DEFAULT_ALIGNMENT_DIR)
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use kgperturb_cli::cli::{ExecutionSummary, render_summary};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = ExecutionSummary::Stripped {
///     input: "raw.json".into(),
///     output: "clean.json".into(),
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(String::from_utf8(buffer)?, "stripped: raw.json -> clean.json\n");
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    let summary = match summary {
        ExecutionSummary::Stripped { input, output } => {
            return writeln!(
                writer,
                "stripped: {} -> {}",
                input.display(),
                output.display()
            );
        }
        ExecutionSummary::Perturbed(summary) => summary,
    };

    writeln!(writer, "input: {}", summary.input.display())?;
    writeln!(writer, "output: {}", summary.output.display())?;
    writeln!(
        writer,
        "entities: {} -> {} (removed {}, added {})",
        summary.input_entities,
        summary.output_entities,
        summary.removed_entities,
        summary.added_entities
    )?;
    writeln!(
        writer,
        "relations: {} -> {} (removed {}, cascaded {}, added {})",
        summary.input_relations,
        summary.output_relations,
        summary.removed_relations,
        summary.cascaded_relations,
        summary.added_relations
    )?;
    writeln!(writer, "mapped entities: {}", summary.mapped_entities)?;
    if let Some(mapping) = &summary.mapping {
        writeln!(writer, "mapping: {}", mapping.display())?;
    }
    let content = &summary.content;
    if content != &ContentReport::default() {
        writeln!(
            writer,
            "content: {} entities renamed, {} relations renamed, {} descriptions, {} failures",
            content.entities_renamed(),
            content.relations_renamed(),
            content.descriptions_synthesized(),
            content.failures()
        )?;
    }
    if let Some(alignment) = &summary.alignment {
        writeln!(
            writer,
            "alignment: {} ({} pairs, {} test, {} train)",
            alignment.directory.display(),
            alignment.aligned_pairs,
            alignment.test_pairs,
            alignment.train_pairs
        )?;
    }
    Ok(())
}
