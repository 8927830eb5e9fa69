//! Document and mapping decoding.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use kgperturb_core::{Entity, EntityId, EntityMapping, IdParseError, KnowledgeGraph, Relation};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::errors::JsonGraphError;

const ENTITIES: &str = "entities";
const RELATIONS: &str = "relations";

/// Identifier convention expected in a document.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum IdScheme {
    /// Input graphs: every identifier is `e<n>`.
    #[default]
    Original,
    /// Perturbed graphs: `e<n>` survivors and `rand_<n>` synthetic entities.
    Perturbed,
}

impl IdScheme {
    fn parse(self, raw: &str) -> Result<EntityId, IdParseError> {
        match self {
            Self::Original => EntityId::parse_original(raw),
            Self::Perturbed => EntityId::parse_perturbed(raw),
        }
    }
}

/// Reads an input graph from `reader`.
///
/// # Errors
/// Returns [`JsonGraphError`] when the document is not valid JSON, lacks the
/// `entities` or `relations` arrays, carries malformed identifiers, or
/// references entities that do not exist.
///
/// # Examples
/// ```
/// use kgperturb_providers_json::read_graph;
///
/// let doc = r#"{
///     "entities": [{"id": "e1", "name": ["Acme"]}, {"id": "e2"}],
///     "relations": [{"source": "e1", "target": "e2", "type": "owns"}]
/// }"#;
/// let graph = read_graph(doc.as_bytes())?;
/// assert_eq!(graph.entity_count(), 2);
/// assert_eq!(graph.relation_count(), 1);
/// # Ok::<(), kgperturb_providers_json::JsonGraphError>(())
/// ```
pub fn read_graph<R: Read>(reader: R) -> Result<KnowledgeGraph, JsonGraphError> {
    let document: Value = serde_json::from_reader(reader)?;
    graph_from_value(document, IdScheme::Original)
}

/// Reads a graph from a file path using the given identifier scheme.
///
/// # Errors
/// Returns [`JsonGraphError::Io`] when the file cannot be opened and the
/// errors of [`graph_from_value`] otherwise.
#[instrument(name = "json.read_graph", err, skip(path), fields(path = %path.as_ref().display()))]
pub fn read_graph_path(
    path: impl AsRef<Path>,
    scheme: IdScheme,
) -> Result<KnowledgeGraph, JsonGraphError> {
    let file = File::open(path.as_ref())?;
    let document: Value = serde_json::from_reader(BufReader::new(file))?;
    graph_from_value(document, scheme)
}

/// Builds a graph from an already parsed document.
///
/// Entity keys other than `id` become attributes. Relation keys other than
/// `source`, `target` and `type` become attributes; a missing `type` decodes
/// as the empty string.
///
/// # Errors
/// See [`read_graph`].
pub fn graph_from_value(
    document: Value,
    scheme: IdScheme,
) -> Result<KnowledgeGraph, JsonGraphError> {
    let Value::Object(mut root) = document else {
        return Err(JsonGraphError::NotAnObject);
    };
    let entities = take_array(&mut root, ENTITIES)?;
    let relations = take_array(&mut root, RELATIONS)?;

    let entities = entities
        .into_iter()
        .enumerate()
        .map(|(index, record)| decode_entity(index, record, scheme))
        .collect::<Result<Vec<_>, _>>()?;
    let relations = relations
        .into_iter()
        .enumerate()
        .map(|(index, record)| decode_relation(index, record, scheme))
        .collect::<Result<Vec<_>, _>>()?;

    let graph = KnowledgeGraph::from_parts(entities, relations)?;
    debug!(
        entities = graph.entity_count(),
        relations = graph.relation_count(),
        "decoded graph"
    );
    Ok(graph)
}

fn take_array(
    root: &mut Map<String, Value>,
    key: &'static str,
) -> Result<Vec<Value>, JsonGraphError> {
    match root.shift_remove(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(JsonGraphError::NotAnArray { key }),
        None => Err(JsonGraphError::MissingKey { key }),
    }
}

fn record_object(
    section: &'static str,
    index: usize,
    record: Value,
) -> Result<Map<String, Value>, JsonGraphError> {
    match record {
        Value::Object(map) => Ok(map),
        _ => Err(JsonGraphError::RecordNotAnObject { section, index }),
    }
}

fn take_string(
    map: &mut Map<String, Value>,
    section: &'static str,
    index: usize,
    field: &'static str,
) -> Result<Option<String>, JsonGraphError> {
    match map.shift_remove(field) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(_) => Err(JsonGraphError::FieldNotAString {
            section,
            index,
            field,
        }),
    }
}

fn take_id(
    map: &mut Map<String, Value>,
    section: &'static str,
    index: usize,
    field: &'static str,
    scheme: IdScheme,
) -> Result<EntityId, JsonGraphError> {
    let raw = take_string(map, section, index, field)?.ok_or(JsonGraphError::MissingField {
        section,
        index,
        field,
    })?;
    scheme
        .parse(&raw)
        .map_err(|source| JsonGraphError::InvalidIdentifier {
            section,
            index,
            source,
        })
}

fn decode_entity(index: usize, record: Value, scheme: IdScheme) -> Result<Entity, JsonGraphError> {
    let mut map = record_object(ENTITIES, index, record)?;
    let id = take_id(&mut map, ENTITIES, index, "id", scheme)?;
    Ok(Entity::new(id, map))
}

fn decode_relation(
    index: usize,
    record: Value,
    scheme: IdScheme,
) -> Result<Relation, JsonGraphError> {
    let mut map = record_object(RELATIONS, index, record)?;
    let source = take_id(&mut map, RELATIONS, index, "source", scheme)?;
    let target = take_id(&mut map, RELATIONS, index, "target", scheme)?;
    let relation_type = take_string(&mut map, RELATIONS, index, "type")?.unwrap_or_default();
    Ok(Relation::new(source, target, relation_type, map))
}

/// Reads a mapping object of original to reassigned identifiers.
///
/// # Errors
/// Returns [`JsonGraphError`] when the document is not a string-valued
/// object, an identifier is malformed, or the pairs are not one-to-one.
pub fn read_mapping<R: Read>(reader: R) -> Result<EntityMapping, JsonGraphError> {
    let document: Value = serde_json::from_reader(reader)?;
    let Value::Object(entries) = document else {
        return Err(JsonGraphError::NotAnObject);
    };
    let mut pairs = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let Value::String(new) = value else {
            return Err(JsonGraphError::MappingValueNotAString { key });
        };
        let original = EntityId::parse_original(&key).map_err(JsonGraphError::MappingIdentifier)?;
        let reassigned =
            EntityId::parse_reassigned(&new).map_err(JsonGraphError::MappingIdentifier)?;
        pairs.push((original, reassigned));
    }
    Ok(EntityMapping::try_from_pairs(pairs)?)
}

/// Reads a mapping from a file path.
///
/// # Errors
/// See [`read_mapping`].
pub fn read_mapping_path(path: impl AsRef<Path>) -> Result<EntityMapping, JsonGraphError> {
    read_mapping(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgperturb_core::Attributes;
    use rstest::rstest;
    use serde_json::json;

    fn attributes(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => Attributes::new(),
        }
    }

    #[rstest]
    fn attributes_keep_document_order() {
        let graph = graph_from_value(
            json!({
                "entities": [{"id": "e1", "type": ["Org"], "name": ["Acme"], "founded": 1901}],
                "relations": []
            }),
            IdScheme::Original,
        )
        .expect("document is valid");
        let entity = graph.entity(EntityId::Original(1)).expect("e1 exists");
        let keys: Vec<&str> = entity.attributes().keys().map(String::as_str).collect();
        assert_eq!(keys, ["type", "name", "founded"]);
        assert_eq!(
            entity.attributes(),
            &attributes(json!({"type": ["Org"], "name": ["Acme"], "founded": 1901}))
        );
    }

    #[rstest]
    fn relation_attributes_keep_document_order() {
        let graph = graph_from_value(
            json!({
                "entities": [{"id": "e1"}, {"id": "e2"}],
                "relations": [{
                    "since": 2001,
                    "source": "e1",
                    "weight": 0.5,
                    "type": "owns",
                    "target": "e2",
                    "note": "majority"
                }]
            }),
            IdScheme::Original,
        )
        .expect("document is valid");
        let relation = graph.relations().next().expect("one relation");
        let keys: Vec<&str> = relation.attributes().keys().map(String::as_str).collect();
        assert_eq!(keys, ["since", "weight", "note"]);
        assert_eq!(relation.relation_type(), "owns");
    }

    #[rstest]
    fn missing_relation_type_defaults_to_empty() {
        let graph = graph_from_value(
            json!({
                "entities": [{"id": "e1"}, {"id": "e2"}],
                "relations": [{"source": "e1", "target": "e2", "weight": 0.5}]
            }),
            IdScheme::Original,
        )
        .expect("document is valid");
        let relation = graph.relations().next().expect("one relation");
        assert_eq!(relation.relation_type(), "");
        assert_eq!(relation.attributes().get("weight"), Some(&json!(0.5)));
    }

    #[rstest]
    fn perturbed_scheme_accepts_synthetic_ids() {
        let graph = graph_from_value(
            json!({
                "entities": [{"id": "rand_1", "type": "RandomEntity"}, {"id": "e4"}],
                "relations": [{"source": "e4", "target": "rand_1", "type": "randomRelation"}]
            }),
            IdScheme::Perturbed,
        )
        .expect("document is valid");
        assert!(graph.contains_entity(EntityId::Synthetic(1)));
        assert!(graph.contains_entity(EntityId::Reassigned(4)));
    }
}
