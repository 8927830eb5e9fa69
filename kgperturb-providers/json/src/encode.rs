//! Document and mapping encoding.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use kgperturb_core::{Entity, EntityMapping, KnowledgeGraph, Relation};
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::errors::JsonGraphError;

fn entity_record(entity: &Entity) -> Value {
    let mut record = Map::with_capacity(entity.attributes().len() + 1);
    record.insert("id".to_owned(), Value::String(entity.id().to_string()));
    for (key, value) in entity.attributes() {
        record.insert(key.clone(), value.clone());
    }
    Value::Object(record)
}

fn relation_record(relation: &Relation) -> Value {
    let mut record = Map::with_capacity(relation.attributes().len() + 3);
    record.insert("source".to_owned(), Value::String(relation.source().to_string()));
    record.insert("target".to_owned(), Value::String(relation.target().to_string()));
    record.insert(
        "type".to_owned(),
        Value::String(relation.relation_type().to_owned()),
    );
    for (key, value) in relation.attributes() {
        record.insert(key.clone(), value.clone());
    }
    Value::Object(record)
}

/// Converts a graph into its document form.
///
/// Entities and relations keep the graph's enumeration order.
#[must_use]
pub fn graph_to_value(graph: &KnowledgeGraph) -> Value {
    json!({
        "entities": graph.entities().map(entity_record).collect::<Vec<_>>(),
        "relations": graph.relations().map(relation_record).collect::<Vec<_>>(),
    })
}

/// Converts a mapping into an object keyed by original identifier.
///
/// # Examples
/// ```
/// use kgperturb_core::{EntityId, EntityMapping};
/// use kgperturb_providers_json::mapping_to_value;
///
/// let mapping = EntityMapping::try_from_pairs([
///     (EntityId::Original(3), EntityId::Reassigned(4)),
///     (EntityId::Original(1), EntityId::Reassigned(5)),
/// ])?;
/// assert_eq!(
///     mapping_to_value(&mapping).to_string(),
///     r#"{"e3":"e4","e1":"e5"}"#,
/// );
/// # Ok::<(), kgperturb_core::MappingError>(())
/// ```
#[must_use]
pub fn mapping_to_value(mapping: &EntityMapping) -> Value {
    Value::Object(
        mapping
            .iter()
            .map(|(original, reassigned)| {
                (original.to_string(), Value::String(reassigned.to_string()))
            })
            .collect(),
    )
}

fn write_pretty<W: Write>(value: &Value, mut writer: W) -> Result<(), JsonGraphError> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes `graph` as pretty-printed JSON followed by a newline.
///
/// # Errors
/// Returns [`JsonGraphError::Io`] or [`JsonGraphError::Json`] when the
/// writer fails.
pub fn write_graph<W: Write>(graph: &KnowledgeGraph, writer: W) -> Result<(), JsonGraphError> {
    write_pretty(&graph_to_value(graph), writer)
}

/// Writes `graph` to `path`, replacing any existing file.
///
/// # Errors
/// See [`write_graph`].
#[instrument(
    name = "json.write_graph",
    err,
    skip(graph, path),
    fields(path = %path.as_ref().display(), entities = graph.entity_count()),
)]
pub fn write_graph_path(
    graph: &KnowledgeGraph,
    path: impl AsRef<Path>,
) -> Result<(), JsonGraphError> {
    write_graph(graph, BufWriter::new(File::create(path.as_ref())?))
}

/// Writes `mapping` as a pretty-printed JSON object in reassignment order.
///
/// # Errors
/// Returns [`JsonGraphError::Io`] or [`JsonGraphError::Json`] when the
/// writer fails.
pub fn write_mapping<W: Write>(mapping: &EntityMapping, writer: W) -> Result<(), JsonGraphError> {
    write_pretty(&mapping_to_value(mapping), writer)
}

/// Writes `mapping` to `path`, replacing any existing file.
///
/// # Errors
/// See [`write_mapping`].
#[instrument(
    name = "json.write_mapping",
    err,
    skip(mapping, path),
    fields(path = %path.as_ref().display(), pairs = mapping.len()),
)]
pub fn write_mapping_path(
    mapping: &EntityMapping,
    path: impl AsRef<Path>,
) -> Result<(), JsonGraphError> {
    write_mapping(mapping, BufWriter::new(File::create(path.as_ref())?))
}
