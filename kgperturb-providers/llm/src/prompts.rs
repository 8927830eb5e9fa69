//! Prompt templates for the three rewrite operations.

use kgperturb_core::{Entity, NAME_KEY, Relation, TYPE_KEY};
use serde_json::Value;

/// Sampling temperature for entity and relation renames.
pub const RENAME_TEMPERATURE: f32 = 0.1;

/// Sampling temperature for description synthesis.
pub const DESCRIPTION_TEMPERATURE: f32 = 0.8;

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

pub(crate) fn rename_entity(entity: &Entity, name: &str) -> String {
    let kind = entity.entity_type().unwrap_or("entity");
    format!(
        "Propose one alternative name for the following {kind}. The alternative must \
         refer to exactly the same real-world entity and must be one that is actually \
         in use, such as an official abbreviation, a registered trade name, or a widely \
         used descriptive reference. Do not invent names. If no reliable alternative \
         exists, repeat the original name unchanged.\n\
         Answer with the alternative only, without quotes, explanations, or formatting.\n\
         \n\
         Entity: {name}\n\
         Alternative:"
    )
}

pub(crate) fn rename_relation(relation_type: &str) -> String {
    format!(
        "Propose one alternative label for the following relation type. The label must \
         keep the same meaning and be one that is commonly used. If no reliable \
         alternative exists, repeat the original label unchanged.\n\
         Answer with the label only, without quotes, explanations, or formatting.\n\
         \n\
         Examples:\n\
         - competes_with -> competes_against\n\
         - partners_with -> collaborates_with\n\
         - is_located_in -> is_based_in\n\
         \n\
         Relation type: {relation_type}\n\
         Alternative:"
    )
}

pub(crate) fn synthesize_description(entity: &Entity, name: &str) -> String {
    let kind = entity.entity_type().unwrap_or("entity");
    let mut attributes: String = entity
        .attributes()
        .iter()
        .filter(|(key, _)| key.as_str() != NAME_KEY && key.as_str() != TYPE_KEY)
        .map(|(key, value)| format!("- {key}: {}\n", render_value(value)))
        .collect();
    if attributes.is_empty() {
        attributes.push_str("(none)\n");
    }
    format!(
        "Write a short, natural description of the entity below as it might appear in a \
         different source, for example a news article, an industry report, or an \
         encyclopedia entry. Use your own knowledge of the entity and feel free to stress \
         aspects other than the listed attributes, but the description must clearly refer \
         to the same real-world entity.\n\
         Answer with the description only.\n\
         \n\
         Entity name: {name}\n\
         Entity type: {kind}\n\
         Known attributes:\n\
         {attributes}\n\
         Description:"
    )
}

pub(crate) fn relation_label(relation: &Relation) -> Option<&str> {
    Some(relation.relation_type()).filter(|label| !label.trim().is_empty())
}
