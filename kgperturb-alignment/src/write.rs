//! Tab-separated output files.

use std::{
    fmt,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use kgperturb_core::{EntityMapping, KnowledgeGraph};
use tracing::{info, instrument};

use crate::{
    errors::AlignmentError,
    labels::tsv_field,
    split::AlignedPair,
    tables::{AlignmentTables, GraphTables},
};

/// Names of the emitted files, in write order.
pub const ALIGNMENT_FILES: [&str; 12] = [
    "type_ids",
    "ent_ids_1",
    "ent_ids_2",
    "ent_types_1",
    "ent_types_2",
    "ref_ent_ids",
    "ref_pairs",
    "sup_pairs",
    "rel_ids_1",
    "rel_ids_2",
    "triples_1",
    "triples_2",
];

/// What [`write_alignment_files`] produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlignmentSummary {
    /// Directory holding the files.
    pub directory: PathBuf,
    /// Paths written, in [`ALIGNMENT_FILES`] order.
    pub files: Vec<PathBuf>,
    /// Number of aligned pairs.
    pub aligned_pairs: usize,
    /// Pairs written to `ref_pairs`.
    pub test_pairs: usize,
    /// Pairs written to `sup_pairs`.
    pub train_pairs: usize,
    /// Distinct entity types across both graphs.
    pub entity_types: usize,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> AlignmentError + '_ {
    move |source| AlignmentError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_lines<I>(path: &Path, lines: I) -> Result<(), AlignmentError>
where
    I: IntoIterator<Item = String>,
{
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(io_error(path))?;
    }
    writer.flush().map_err(io_error(path))
}

fn named_rows<K: fmt::Display>(rows: &[(K, String)]) -> Vec<String> {
    rows.iter()
        .map(|(key, label)| format!("{key}\t{}", tsv_field(label)))
        .collect()
}

fn pair_rows(pairs: &[AlignedPair]) -> Vec<String> {
    pairs
        .iter()
        .map(|(left, right)| format!("{left}\t{right}"))
        .collect()
}

fn type_rows(tables: &GraphTables) -> Vec<String> {
    tables
        .entity_types
        .iter()
        .map(|(id, type_id)| format!("{id}\t{type_id}"))
        .collect()
}

fn triple_rows(tables: &GraphTables) -> Vec<String> {
    tables
        .triples
        .iter()
        .map(|(head, relation, tail)| format!("{head}\t{relation}\t{tail}"))
        .collect()
}

impl AlignmentTables {
    fn rows(&self) -> [Vec<String>; 12] {
        [
            named_rows(&self.type_ids),
            named_rows(&self.original.entity_names),
            named_rows(&self.perturbed.entity_names),
            type_rows(&self.original),
            type_rows(&self.perturbed),
            pair_rows(self.pairs.all()),
            pair_rows(self.pairs.test()),
            pair_rows(self.pairs.train()),
            named_rows(&self.original.relation_ids),
            named_rows(&self.perturbed.relation_ids),
            triple_rows(&self.original),
            triple_rows(&self.perturbed),
        ]
    }

    /// Writes every table into `directory`, creating it when missing.
    ///
    /// # Errors
    /// Returns [`AlignmentError::Io`] naming the path that could not be
    /// created or written.
    pub fn write_to(&self, directory: &Path) -> Result<AlignmentSummary, AlignmentError> {
        fs::create_dir_all(directory).map_err(io_error(directory))?;
        let mut files = Vec::with_capacity(ALIGNMENT_FILES.len());
        for (name, lines) in ALIGNMENT_FILES.iter().zip(self.rows()) {
            let path = directory.join(name);
            write_lines(&path, lines)?;
            files.push(path);
        }
        Ok(AlignmentSummary {
            directory: directory.to_path_buf(),
            files,
            aligned_pairs: self.pairs.all().len(),
            test_pairs: self.pairs.test().len(),
            train_pairs: self.pairs.train().len(),
            entity_types: self.type_ids.len(),
        })
    }
}

/// Builds the alignment tables and writes them into `directory`.
///
/// # Errors
/// Returns the errors of [`AlignmentTables::build`] and
/// [`AlignmentTables::write_to`].
#[instrument(
    name = "align.write",
    err,
    skip(original, perturbed, mapping, directory),
    fields(directory = %directory.display(), pairs = mapping.len()),
)]
pub fn write_alignment_files(
    original: &KnowledgeGraph,
    perturbed: &KnowledgeGraph,
    mapping: &EntityMapping,
    directory: &Path,
) -> Result<AlignmentSummary, AlignmentError> {
    let tables = AlignmentTables::build(original, perturbed, mapping)?;
    let summary = tables.write_to(directory)?;
    info!(
        files = summary.files.len(),
        test_pairs = summary.test_pairs,
        train_pairs = summary.train_pairs,
        "alignment files written"
    );
    Ok(summary)
}
