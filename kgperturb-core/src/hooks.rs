//! Content perturbation hooks.
//!
//! The passes in this module decide which entities and relations are eligible
//! for rewriting and how returned text is written back. The text itself comes
//! from a [`TextRewriter`] backend. A backend failure for one item is logged
//! and counted; the pass continues with the next item.

use std::{error::Error as StdError, fmt};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::graph::{DESCRIPTION_KEY, Entity, KnowledgeGraph, NAME_KEY, Relation};

/// Content pass identifiers, in pipeline order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RewriteOperation {
    /// Replace an entity's display name.
    RenameEntity,
    /// Replace a relation's type label.
    RenameRelation,
    /// Synthesize a fresh entity description.
    SynthesizeDescription,
}

impl RewriteOperation {
    /// Stable snake-case label used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RenameEntity => "rename_entity",
            Self::RenameRelation => "rename_relation",
            Self::SynthesizeDescription => "synthesize_description",
        }
    }
}

impl fmt::Display for RewriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a [`TextRewriter`] for a single item.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RewriteError {
    /// The backend could not produce a completion.
    #[error("backend `{backend}` failed: {source}")]
    Backend {
        /// Name of the failing backend.
        backend: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// The backend does not implement the operation.
    #[error("operation `{operation}` is not supported by this backend")]
    Unsupported {
        /// Operation that was requested.
        operation: RewriteOperation,
    },
}

/// Text-rewriting capability consumed by the content passes.
///
/// Each method returns `Ok(None)` when the backend declines to rewrite the
/// item. Empty or whitespace-only text is treated the same way.
pub trait TextRewriter {
    /// Human-readable backend name used in diagnostics.
    fn name(&self) -> &str;

    /// Proposes an alternative display name for an entity.
    ///
    /// # Errors
    /// Returns [`RewriteError`] when the backend fails.
    fn rename_entity(&self, entity: &Entity) -> Result<Option<String>, RewriteError>;

    /// Proposes an alternative type label for a relation.
    ///
    /// # Errors
    /// Returns [`RewriteError`] when the backend fails.
    fn rename_relation(&self, relation: &Relation) -> Result<Option<String>, RewriteError>;

    /// Synthesizes a new description for an entity.
    ///
    /// # Errors
    /// Returns [`RewriteError`] when the backend fails.
    fn synthesize_description(&self, entity: &Entity) -> Result<Option<String>, RewriteError>;
}

/// Controls where synthesized descriptions are written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DescriptionPolicy {
    /// Write the text into the `description` attribute.
    pub update_description: bool,
    /// Write the text into the `name` attribute.
    pub update_name: bool,
}

impl Default for DescriptionPolicy {
    fn default() -> Self {
        Self {
            update_description: true,
            update_name: false,
        }
    }
}

impl DescriptionPolicy {
    /// Returns whether the policy writes anything at all.
    #[must_use]
    pub const fn writes_anything(self) -> bool {
        self.update_description || self.update_name
    }
}

/// Per-pass counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PassReport {
    /// Items the pass asked the backend about.
    pub considered: usize,
    /// Items whose attributes were rewritten.
    pub updated: usize,
    /// Items for which the backend returned an error.
    pub failed: usize,
}

/// Aggregate outcome of the content passes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ContentReport {
    /// Entity rename pass counters, if the pass ran.
    pub rename_entities: Option<PassReport>,
    /// Relation rename pass counters, if the pass ran.
    pub rename_relations: Option<PassReport>,
    /// Description pass counters, if the pass ran.
    pub synthesize_descriptions: Option<PassReport>,
}

impl ContentReport {
    /// Number of entities whose name was replaced.
    #[must_use]
    pub fn entities_renamed(&self) -> usize {
        self.rename_entities.map_or(0, |pass| pass.updated)
    }

    /// Number of relations whose type was replaced.
    #[must_use]
    pub fn relations_renamed(&self) -> usize {
        self.rename_relations.map_or(0, |pass| pass.updated)
    }

    /// Number of entities that received a synthesized description.
    #[must_use]
    pub fn descriptions_synthesized(&self) -> usize {
        self.synthesize_descriptions.map_or(0, |pass| pass.updated)
    }

    /// Backend failures across all passes.
    #[must_use]
    pub fn failures(&self) -> usize {
        [
            self.rename_entities,
            self.rename_relations,
            self.synthesize_descriptions,
        ]
        .into_iter()
        .flatten()
        .map(|pass| pass.failed)
        .sum()
    }
}

fn usable(
    proposal: Result<Option<String>, RewriteError>,
    report: &mut PassReport,
    item: &dyn fmt::Display,
    backend: &str,
    operation: RewriteOperation,
) -> Option<String> {
    report.considered += 1;
    match proposal {
        Ok(Some(text)) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Ok(None) => None,
        Err(error) => {
            report.failed += 1;
            warn!(%item, backend, %operation, %error, "rewrite failed; leaving item unchanged");
            None
        }
    }
}

fn has_text(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        _ => false,
    }
}

/// Replaces the first element of a list-valued name, or the whole scalar.
fn write_name(entity: &mut Entity, text: String) {
    let attributes = entity.attributes_mut();
    if let Some(Value::Array(items)) = attributes.get_mut(NAME_KEY)
        && let Some(first) = items.first_mut()
    {
        *first = Value::String(text);
        return;
    }
    attributes.insert(NAME_KEY.to_owned(), Value::String(text));
}

fn write_description(entity: &mut Entity, text: String) {
    let attributes = entity.attributes_mut();
    let value = match attributes.get(DESCRIPTION_KEY) {
        Some(Value::String(_)) => Value::String(text),
        _ => Value::Array(vec![Value::String(text)]),
    };
    attributes.insert(DESCRIPTION_KEY.to_owned(), value);
}

/// Replaces the display name of every eligible entity.
///
/// Synthetic entities and entities without a non-empty name are skipped.
#[instrument(name = "core.rename_entities", skip_all, fields(backend = rewriter.name()))]
pub fn rename_entities(graph: &mut KnowledgeGraph, rewriter: &dyn TextRewriter) -> PassReport {
    let mut report = PassReport::default();
    for id in graph.entity_ids() {
        let Some(entity) = graph.entity_mut(id) else {
            continue;
        };
        if entity.is_synthetic() || !has_text(entity.attributes().get(NAME_KEY)) {
            continue;
        }
        let proposal = rewriter.rename_entity(entity);
        if let Some(text) = usable(
            proposal,
            &mut report,
            &id,
            rewriter.name(),
            RewriteOperation::RenameEntity,
        ) {
            write_name(entity, text);
            report.updated += 1;
        }
    }
    debug!(?report, "entity rename pass finished");
    report
}

/// Replaces the type label of every eligible relation.
///
/// Synthetic relations and relations with an empty type are skipped.
#[instrument(name = "core.rename_relations", skip_all, fields(backend = rewriter.name()))]
pub fn rename_relations(graph: &mut KnowledgeGraph, rewriter: &dyn TextRewriter) -> PassReport {
    let mut report = PassReport::default();
    for handle in graph.relation_ids() {
        let Some(relation) = graph.relation_mut(handle) else {
            continue;
        };
        if relation.is_synthetic() || relation.relation_type().trim().is_empty() {
            continue;
        }
        let proposal = rewriter.rename_relation(relation);
        let label = format!("{} -> {}", relation.source(), relation.target());
        if let Some(text) = usable(
            proposal,
            &mut report,
            &label,
            rewriter.name(),
            RewriteOperation::RenameRelation,
        ) {
            relation.set_relation_type(text);
            report.updated += 1;
        }
    }
    debug!(?report, "relation rename pass finished");
    report
}

/// Synthesizes descriptions for every eligible entity and writes them back
/// according to `policy`.
///
/// Synthetic entities, entities without attributes, and entities without a
/// non-empty name are skipped.
#[instrument(name = "core.synthesize_descriptions", skip_all, fields(backend = rewriter.name()))]
pub fn synthesize_descriptions(
    graph: &mut KnowledgeGraph,
    rewriter: &dyn TextRewriter,
    policy: DescriptionPolicy,
) -> PassReport {
    let mut report = PassReport::default();
    for id in graph.entity_ids() {
        let Some(entity) = graph.entity_mut(id) else {
            continue;
        };
        if entity.is_synthetic()
            || entity.attributes().is_empty()
            || !has_text(entity.attributes().get(NAME_KEY))
        {
            continue;
        }
        let proposal = rewriter.synthesize_description(entity);
        let Some(text) = usable(
            proposal,
            &mut report,
            &id,
            rewriter.name(),
            RewriteOperation::SynthesizeDescription,
        ) else {
            continue;
        };
        if policy.update_name {
            write_name(entity, text.clone());
        }
        if policy.update_description {
            write_description(entity, text);
        }
        report.updated += 1;
    }
    debug!(?report, "description pass finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{Attributes, SYNTHETIC_RELATION_TYPE},
        id::EntityId,
    };
    use rstest::{fixture, rstest};
    use serde_json::json;

    struct Echo;

    impl TextRewriter for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn rename_entity(&self, entity: &Entity) -> Result<Option<String>, RewriteError> {
            Ok(entity.name().map(|name| format!("  {name} (alt)  ")))
        }

        fn rename_relation(&self, relation: &Relation) -> Result<Option<String>, RewriteError> {
            if relation.relation_type() == "fails" {
                return Err(RewriteError::Unsupported {
                    operation: RewriteOperation::RenameRelation,
                });
            }
            Ok(Some(format!("{}_alt", relation.relation_type())))
        }

        fn synthesize_description(
            &self,
            entity: &Entity,
        ) -> Result<Option<String>, RewriteError> {
            Ok(entity.name().filter(|name| *name != "blank").map(|name| {
                format!("About {name}")
            }))
        }
    }

    fn entity(ordinal: u64, attributes: serde_json::Value) -> Entity {
        let serde_json::Value::Object(map) = attributes else {
            panic!("attributes must be an object");
        };
        Entity::new(EntityId::Reassigned(ordinal), map)
    }

    #[fixture]
    fn graph() -> KnowledgeGraph {
        KnowledgeGraph::from_parts(
            [
                entity(1, json!({"name": ["Acme", "ACME"], "type": "Org", "description": "old"})),
                entity(2, json!({"name": "Bolt", "type": "Org"})),
                entity(3, json!({"type": "Org"})),
                entity(4, json!({"name": "blank"})),
                Entity::synthetic(EntityId::Synthetic(1)),
            ],
            [
                Relation::new(
                    EntityId::Reassigned(1),
                    EntityId::Reassigned(2),
                    "partners_with",
                    Attributes::new(),
                ),
                Relation::new(
                    EntityId::Reassigned(2),
                    EntityId::Reassigned(1),
                    "fails",
                    Attributes::new(),
                ),
                Relation::new(
                    EntityId::Reassigned(2),
                    EntityId::Reassigned(3),
                    "",
                    Attributes::new(),
                ),
                Relation::synthetic(EntityId::Reassigned(1), EntityId::Synthetic(1)),
            ],
        )
        .expect("fixture graph is valid")
    }

    fn attrs(graph: &KnowledgeGraph, ordinal: u64) -> &Attributes {
        graph
            .entity(EntityId::Reassigned(ordinal))
            .expect("entity exists")
            .attributes()
    }

    #[rstest]
    fn rename_entities_preserves_field_shape(mut graph: KnowledgeGraph) {
        let report = rename_entities(&mut graph, &Echo);
        assert_eq!(report.considered, 3);
        assert_eq!(report.updated, 3);
        assert_eq!(attrs(&graph, 1)["name"], json!(["Acme (alt)", "ACME"]));
        assert_eq!(attrs(&graph, 2)["name"], json!("Bolt (alt)"));
        assert!(attrs(&graph, 3).get("name").is_none());
    }

    #[rstest]
    fn rename_relations_skips_synthetic_and_unlabelled(mut graph: KnowledgeGraph) {
        let report = rename_relations(&mut graph, &Echo);
        assert_eq!(
            report,
            PassReport {
                considered: 2,
                updated: 1,
                failed: 1
            }
        );
        let labels: Vec<_> = graph.relations().map(Relation::relation_type).collect();
        assert_eq!(
            labels,
            vec!["partners_with_alt", "fails", "", SYNTHETIC_RELATION_TYPE]
        );
    }

    #[rstest]
    #[case::default_policy(DescriptionPolicy::default(), json!("About Bolt"), json!("Bolt"))]
    #[case::names_too(
        DescriptionPolicy { update_description: true, update_name: true },
        json!("About Bolt"),
        json!("About Bolt")
    )]
    fn descriptions_follow_policy(
        mut graph: KnowledgeGraph,
        #[case] policy: DescriptionPolicy,
        #[case] description_one: serde_json::Value,
        #[case] name_two: serde_json::Value,
    ) {
        let report = synthesize_descriptions(&mut graph, &Echo, policy);
        assert_eq!(report.considered, 3);
        assert_eq!(report.updated, 2);
        assert_eq!(attrs(&graph, 1)["description"], json!("About Acme"));
        assert_eq!(attrs(&graph, 2)["description"], json!([description_one]));
        assert_eq!(attrs(&graph, 2)["name"], name_two);
        assert!(attrs(&graph, 4).get("description").is_none());
    }

    #[rstest]
    fn content_report_sums_failures() {
        let report = ContentReport {
            rename_entities: Some(PassReport {
                considered: 2,
                updated: 1,
                failed: 1,
            }),
            rename_relations: None,
            synthesize_descriptions: Some(PassReport {
                considered: 1,
                updated: 0,
                failed: 1,
            }),
        };
        assert_eq!(report.failures(), 2);
        assert_eq!(report.entities_renamed(), 1);
        assert_eq!(report.relations_renamed(), 0);
    }
}
