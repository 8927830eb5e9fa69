//! Display names and type labels.

use kgperturb_core::{Entity, TYPE_KEY};
use serde_json::Value;

/// Attribute keys consulted, in order, for an entity's display name.
pub const NAME_KEYS: [&str; 8] = [
    "name",
    "fullName",
    "locationName",
    "kpiName",
    "metricName",
    "headcountName",
    "contextName",
    "titleName",
];

/// Label used for entities without a type.
pub const UNKNOWN_TYPE: &str = "Unknown";

const ONTOLOGY_PREFIX: &str = "pekg:";

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::Bool(true) | Value::Number(_) => true,
    }
}

/// Keeps a label on one TSV field.
pub(crate) fn tsv_field(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

/// Removes the ontology namespace from a type label.
#[must_use]
pub fn strip_ontology_prefix(label: &str) -> String {
    label.replace(ONTOLOGY_PREFIX, "")
}

/// Returns the display name of `entity`.
///
/// The first present attribute among [`NAME_KEYS`] wins; list values
/// contribute their first element. Entities without any of them fall back to
/// their identifier.
#[must_use]
pub fn display_name(entity: &Entity) -> String {
    NAME_KEYS
        .iter()
        .find_map(|key| entity.attributes().get(*key).filter(|value| is_present(value)))
        .and_then(|value| match value {
            Value::Array(items) => items.first().map(scalar_text),
            other => Some(scalar_text(other)),
        })
        .unwrap_or_else(|| entity.id().to_string())
}

/// Returns the type label of `entity` without its ontology prefix.
#[must_use]
pub fn type_label(entity: &Entity) -> String {
    let raw = match entity.attributes().get(TYPE_KEY) {
        None => UNKNOWN_TYPE.to_owned(),
        Some(Value::Array(items)) => items
            .first()
            .map_or_else(|| UNKNOWN_TYPE.to_owned(), scalar_text),
        Some(other) => scalar_text(other),
    };
    strip_ontology_prefix(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgperturb_core::{Attributes, EntityId};
    use rstest::rstest;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        let attributes = match value {
            Value::Object(map) => map,
            _ => Attributes::new(),
        };
        Entity::new(EntityId::Original(7), attributes)
    }

    #[rstest]
    #[case::list_name(json!({"name": ["Acme", "ACME"]}), "Acme")]
    #[case::scalar_name(json!({"name": "Acme"}), "Acme")]
    #[case::empty_name_falls_through(json!({"name": [], "fullName": "Acme Corporation"}), "Acme Corporation")]
    #[case::later_key(json!({"kpiName": ["Revenue"]}), "Revenue")]
    #[case::numeric(json!({"titleName": 2024}), "2024")]
    #[case::nothing(json!({"description": "unnamed"}), "e7")]
    fn names_follow_key_priority(#[case] attributes: Value, #[case] expected: &str) {
        assert_eq!(display_name(&entity(attributes)), expected);
    }

    #[rstest]
    #[case::list(json!({"type": ["pekg:Company", "Org"]}), "Company")]
    #[case::scalar(json!({"type": "Person"}), "Person")]
    #[case::empty_list(json!({"type": []}), "Unknown")]
    #[case::missing(json!({}), "Unknown")]
    fn types_take_the_first_label(#[case] attributes: Value, #[case] expected: &str) {
        assert_eq!(type_label(&entity(attributes)), expected);
    }

    #[rstest]
    fn tsv_fields_stay_on_one_line() {
        assert_eq!(tsv_field("Acme\tCorp\nLtd"), "Acme Corp Ltd");
    }
}
