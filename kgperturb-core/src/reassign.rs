//! Identifier reassignment.
//!
//! After structural mutation, every surviving entity moves into the
//! reassigned namespace. Survivors are numbered sequentially in the graph's
//! enumeration order starting at `base + 1`, relations are rewritten through
//! the resulting mapping, and any relation left without both endpoints is
//! dropped.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{instrument, warn};

use crate::{
    error::{PerturbError, Result},
    graph::{Entity, KnowledgeGraph},
    id::EntityId,
};

/// Original-to-reassigned identifier correspondence for surviving entities.
///
/// Pairs are kept in reassignment order.
///
/// # Examples
/// ```
/// use kgperturb_core::{EntityId, EntityMapping};
///
/// let mapping = EntityMapping::try_from_pairs([
///     (EntityId::Original(1), EntityId::Reassigned(4)),
///     (EntityId::Original(3), EntityId::Reassigned(5)),
/// ])?;
/// assert_eq!(mapping.get(EntityId::Original(3)), Some(EntityId::Reassigned(5)));
/// assert_eq!(mapping.len(), 2);
/// # Ok::<(), kgperturb_core::MappingError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityMapping {
    pairs: Vec<(EntityId, EntityId)>,
    lookup: HashMap<EntityId, EntityId>,
}

/// Error raised when mapping pairs are not one-to-one.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum MappingError {
    /// The same original identifier appears twice.
    #[error("original identifier `{id}` is mapped more than once")]
    DuplicateKey {
        /// Repeated original identifier.
        id: EntityId,
    },
    /// Two originals map to the same new identifier.
    #[error("new identifier `{id}` is the target of more than one mapping")]
    DuplicateValue {
        /// Repeated new identifier.
        id: EntityId,
    },
}

impl EntityMapping {
    /// Builds a mapping from ordered pairs.
    ///
    /// # Errors
    /// Returns [`MappingError`] when keys or values repeat.
    pub fn try_from_pairs(
        pairs: impl IntoIterator<Item = (EntityId, EntityId)>,
    ) -> core::result::Result<Self, MappingError> {
        let mut mapping = Self::default();
        let mut targets = HashSet::new();
        for (original, new) in pairs {
            if mapping.lookup.contains_key(&original) {
                return Err(MappingError::DuplicateKey { id: original });
            }
            if !targets.insert(new) {
                return Err(MappingError::DuplicateValue { id: new });
            }
            mapping.lookup.insert(original, new);
            mapping.pairs.push((original, new));
        }
        Ok(mapping)
    }

    /// Returns the new identifier for `original`.
    #[must_use]
    pub fn get(&self, original: EntityId) -> Option<EntityId> {
        self.lookup.get(&original).copied()
    }

    /// Returns whether `original` has an entry.
    #[must_use]
    pub fn contains_key(&self, original: EntityId) -> bool {
        self.lookup.contains_key(&original)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates `(original, new)` pairs in reassignment order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, EntityId)> + '_ {
        self.pairs.iter().copied()
    }

    /// Iterates original identifiers in reassignment order.
    pub fn keys(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.pairs.iter().map(|(original, _)| *original)
    }

    /// Iterates new identifiers in reassignment order.
    pub fn values(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.pairs.iter().map(|(_, new)| *new)
    }
}

/// Result of [`reassign_entity_ids`].
#[derive(Clone, Debug, PartialEq)]
pub struct Reassignment {
    /// The rewritten graph.
    pub graph: KnowledgeGraph,
    /// Survivor mapping.
    pub mapping: EntityMapping,
    /// Relations dropped because an endpoint did not resolve.
    pub dropped_relations: usize,
}

/// Moves survivors into the reassigned namespace.
///
/// Every entity that is not listed in `added` is a survivor; removed entities
/// are expected to be gone from `graph` already and are skipped if still
/// present. Survivors are numbered `base + 1, base + 2, ...` in enumeration
/// order. Entities listed in `added` keep their identifiers. The returned
/// graph lists the retained added entities first, then survivors, and keeps
/// relation order.
///
/// # Errors
/// Returns [`PerturbError::NamespaceExhausted`] when the reassigned ordinals
/// would overflow, or a mapping error if the numbering collides.
#[instrument(
    name = "core.reassign",
    level = "debug",
    skip(graph, removed, added),
    fields(survivors = tracing::field::Empty)
)]
pub fn reassign_entity_ids(
    graph: KnowledgeGraph,
    removed: &[EntityId],
    added: &[EntityId],
    base: u64,
) -> Result<Reassignment> {
    let removed: HashSet<EntityId> = removed.iter().copied().collect();
    let added: HashSet<EntityId> = added.iter().copied().collect();
    let (entities, relations) = graph.into_parts();

    let (kept, survivors): (Vec<Entity>, Vec<Entity>) = entities
        .into_iter()
        .filter(|entity| !removed.contains(&entity.id()))
        .partition(|entity| added.contains(&entity.id()));
    tracing::Span::current().record("survivors", survivors.len());

    let mut pairs = Vec::with_capacity(survivors.len());
    let mut next = base;
    for survivor in &survivors {
        next = next
            .checked_add(1)
            .ok_or(PerturbError::NamespaceExhausted {
                base,
                survivors: survivors.len(),
            })?;
        pairs.push((survivor.id(), EntityId::Reassigned(next)));
    }
    let mapping = EntityMapping::try_from_pairs(pairs)?;

    let mut rewritten = KnowledgeGraph::new();
    for entity in kept {
        rewritten.add_entity(entity)?;
    }
    for (survivor, new_id) in survivors.into_iter().zip(mapping.values()) {
        rewritten.add_entity(survivor.with_id(new_id))?;
    }

    let mut dropped_relations = 0;
    for relation in relations {
        let source = mapping.get(relation.source()).unwrap_or(relation.source());
        let target = mapping.get(relation.target()).unwrap_or(relation.target());
        if !(rewritten.contains_entity(source) && rewritten.contains_entity(target)) {
            warn!(%source, %target, "dropping relation with unresolved endpoint");
            dropped_relations += 1;
            continue;
        }
        rewritten.add_relation(relation.with_endpoints(source, target))?;
    }

    Ok(Reassignment {
        graph: rewritten,
        mapping,
        dropped_relations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Attributes, Relation};
    use rstest::rstest;

    fn entity(id: EntityId) -> Entity {
        Entity::new(id, Attributes::new())
    }

    fn relation(source: EntityId, target: EntityId) -> Relation {
        Relation::new(source, target, "r", Attributes::new())
    }

    fn relation_endpoints(relation: &Relation) -> [EntityId; 2] {
        [relation.source(), relation.target()]
    }

    #[rstest]
    fn survivors_are_numbered_after_base_in_enumeration_order() {
        let graph = KnowledgeGraph::from_parts(
            [
                entity(EntityId::Original(1)),
                entity(EntityId::Synthetic(1)),
                entity(EntityId::Original(3)),
            ],
            [
                relation(EntityId::Original(1), EntityId::Synthetic(1)),
                relation(EntityId::Synthetic(1), EntityId::Original(3)),
            ],
        )
        .expect("valid graph");

        let result = reassign_entity_ids(graph, &[], &[EntityId::Synthetic(1)], 3)
            .expect("reassignment succeeds");

        let pairs: Vec<_> = result.mapping.iter().collect();
        assert_eq!(
            pairs,
            vec![
                (EntityId::Original(1), EntityId::Reassigned(4)),
                (EntityId::Original(3), EntityId::Reassigned(5)),
            ]
        );
        assert_eq!(
            result.graph.entity_ids(),
            vec![
                EntityId::Synthetic(1),
                EntityId::Reassigned(4),
                EntityId::Reassigned(5)
            ]
        );
        let endpoints: Vec<_> = result.graph.relations().map(relation_endpoints).collect();
        assert_eq!(
            endpoints,
            vec![
                [EntityId::Reassigned(4), EntityId::Synthetic(1)],
                [EntityId::Synthetic(1), EntityId::Reassigned(5)],
            ]
        );
        assert_eq!(result.dropped_relations, 0);
    }

    #[rstest]
    fn relations_to_lingering_removed_entities_are_dropped() {
        let graph = KnowledgeGraph::from_parts(
            [entity(EntityId::Original(1)), entity(EntityId::Original(2))],
            [relation(EntityId::Original(1), EntityId::Original(2))],
        )
        .expect("valid graph");

        let result = reassign_entity_ids(graph, &[EntityId::Original(2)], &[], 2)
            .expect("reassignment succeeds");

        assert_eq!(result.dropped_relations, 1);
        assert_eq!(result.graph.relation_count(), 0);
        assert_eq!(result.graph.entity_ids(), vec![EntityId::Reassigned(3)]);
        assert!(!result.mapping.contains_key(EntityId::Original(2)));
    }

    #[rstest]
    fn overflowing_namespace_is_reported() {
        let graph =
            KnowledgeGraph::from_parts([entity(EntityId::Original(1))], []).expect("valid graph");
        let err = reassign_entity_ids(graph, &[], &[], u64::MAX).expect_err("must overflow");
        assert!(matches!(err, PerturbError::NamespaceExhausted { .. }));
    }

    #[rstest]
    #[case::key(
        [
            (EntityId::Original(1), EntityId::Reassigned(2)),
            (EntityId::Original(1), EntityId::Reassigned(3)),
        ],
        MappingError::DuplicateKey { id: EntityId::Original(1) }
    )]
    #[case::value(
        [
            (EntityId::Original(1), EntityId::Reassigned(3)),
            (EntityId::Original(2), EntityId::Reassigned(3)),
        ],
        MappingError::DuplicateValue { id: EntityId::Reassigned(3) }
    )]
    fn mapping_rejects_non_injective_pairs(
        #[case] pairs: [(EntityId, EntityId); 2],
        #[case] expected: MappingError,
    ) {
        assert_eq!(EntityMapping::try_from_pairs(pairs), Err(expected));
    }
}
