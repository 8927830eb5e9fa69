//! Entity-alignment training files for a perturbed knowledge graph.
//!
//! Given the original graph, its perturbed counterpart and the survivor
//! mapping, the emitter writes twelve tab-separated files: entity, type and
//! relation dictionaries for both graphs, the triples of both graphs, and the
//! aligned entity pairs split into a test and a train set with a fixed seed.

mod errors;
mod ids;
mod labels;
mod split;
mod tables;
mod write;

pub use errors::AlignmentError;
pub use ids::IdSpace;
pub use labels::{NAME_KEYS, UNKNOWN_TYPE, display_name, strip_ontology_prefix, type_label};
pub use split::{AlignedPair, PairSplit, SPLIT_SEED, TEST_PERCENT};
pub use tables::{AlignmentTables, GraphTables};
pub use write::{ALIGNMENT_FILES, AlignmentSummary, write_alignment_files};
