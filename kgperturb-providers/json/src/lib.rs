//! JSON codec for knowledge graphs.
//!
//! Reads and writes the `{"entities": [...], "relations": [...]}` document
//! shape, serialises entity mappings, and simplifies source-annotated
//! extraction output into that shape.

mod decode;
mod encode;
mod errors;
mod simplify;

pub use decode::{
    IdScheme, graph_from_value, read_graph, read_graph_path, read_mapping, read_mapping_path,
};
pub use encode::{
    graph_to_value, mapping_to_value, write_graph, write_graph_path, write_mapping,
    write_mapping_path,
};
pub use errors::JsonGraphError;
pub use simplify::{simplify_document, simplify_path};
