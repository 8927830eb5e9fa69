//! Source-stripping simplifier for extraction-pipeline documents.
//!
//! Extraction output wraps attribute values in provenance records
//! (`[{"value": ..., "source_doc_id": ...}]`) and prefixes types with an
//! ontology namespace. The simplifier reduces such documents to the plain
//! shape accepted by [`crate::read_graph`].

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::errors::JsonGraphError;

const TYPE_PREFIX: &str = "pekg:";
const SOURCE_PREFIX: &str = "_source";
const SOURCE_DOC_KEY: &str = "source_doc_id";

fn is_provenance_key(key: &str) -> bool {
    key.starts_with(SOURCE_PREFIX) || key == SOURCE_DOC_KEY
}

fn unwrap_values(value: Value) -> Value {
    let Value::Array(items) = value else {
        return value;
    };
    let wrapped = items
        .iter()
        .all(|item| item.as_object().is_some_and(|record| record.contains_key("value")));
    if !wrapped {
        return Value::Array(items);
    }

    let mut values = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(mut record) = item else {
            continue;
        };
        match record.shift_remove("value") {
            Some(Value::Array(nested)) => values.extend(nested),
            Some(inner) => values.push(inner),
            None => {}
        }
    }
    Value::Array(values)
}

fn simplify_record(
    section: &'static str,
    index: usize,
    record: Value,
) -> Result<Value, JsonGraphError> {
    let Value::Object(fields) = record else {
        return Err(JsonGraphError::RecordNotAnObject { section, index });
    };
    let mut simplified: Map<String, Value> = fields
        .into_iter()
        .filter(|(key, _)| !is_provenance_key(key))
        .map(|(key, value)| (key, unwrap_values(value)))
        .collect();
    if let Some(Value::String(kind)) = simplified.get_mut("type") {
        *kind = kind.replace(TYPE_PREFIX, "");
    }
    Ok(Value::Object(simplified))
}

fn simplify_section(
    section: &'static str,
    records: Option<Value>,
) -> Result<Vec<Value>, JsonGraphError> {
    match records {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(index, record)| simplify_record(section, index, record))
            .collect(),
        Some(_) => Err(JsonGraphError::NotAnArray { key: section }),
    }
}

/// Strips provenance from an extraction document.
///
/// Entities come from `entities` and relations from `relationships`, falling
/// back to `relations`; an absent section yields an empty list. Keys starting
/// with `_source` and the `source_doc_id` key are dropped, lists of
/// `{"value": ...}` records collapse into the plain values, and the `pekg:`
/// prefix is removed from string `type` fields.
///
/// # Errors
/// Returns [`JsonGraphError`] when the document or one of its records is
/// not an object, or when a section is not an array.
///
/// # Examples
/// ```
/// use kgperturb_providers_json::simplify_document;
/// use serde_json::json;
///
/// let raw = json!({
///     "entities": [{
///         "id": "e1",
///         "type": "pekg:Company",
///         "name": [{"value": "Acme", "source_doc_id": "d1"}],
///         "_source_span": [0, 4]
///     }],
///     "relationships": []
/// });
/// let simple = simplify_document(raw)?;
/// assert_eq!(
///     simple,
///     json!({"entities": [{"id": "e1", "type": "Company", "name": ["Acme"]}], "relations": []})
/// );
/// # Ok::<(), kgperturb_providers_json::JsonGraphError>(())
/// ```
pub fn simplify_document(document: Value) -> Result<Value, JsonGraphError> {
    let Value::Object(mut root) = document else {
        return Err(JsonGraphError::NotAnObject);
    };
    let entities = simplify_section("entities", root.shift_remove("entities"))?;
    let relations = match root.shift_remove("relationships") {
        Some(records) => simplify_section("relationships", Some(records))?,
        None => simplify_section("relations", root.shift_remove("relations"))?,
    };
    debug!(
        entities = entities.len(),
        relations = relations.len(),
        "simplified document"
    );

    let mut simplified = Map::with_capacity(2);
    simplified.insert("entities".to_owned(), Value::Array(entities));
    simplified.insert("relations".to_owned(), Value::Array(relations));
    Ok(Value::Object(simplified))
}

/// Reads `input`, simplifies it, and writes pretty-printed JSON to `output`.
///
/// # Errors
/// Returns [`JsonGraphError::Io`] or [`JsonGraphError::Json`] on file or
/// parse failures and the errors of [`simplify_document`] otherwise.
#[instrument(
    name = "json.simplify",
    err,
    skip(input, output),
    fields(input = %input.as_ref().display(), output = %output.as_ref().display()),
)]
pub fn simplify_path(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<(), JsonGraphError> {
    let document: Value = serde_json::from_reader(BufReader::new(File::open(input.as_ref())?))?;
    let simplified = simplify_document(document)?;
    let mut writer = BufWriter::new(File::create(output.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, &simplified)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
