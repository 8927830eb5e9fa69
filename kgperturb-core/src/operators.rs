//! Structural mutation operators.
//!
//! Each operator draws from the caller's random source and works on index
//! snapshots of the live graph, so the sequence of draws depends only on the
//! seed and the enumeration order of the graph.

use rand::{Rng, seq::SliceRandom};
use tracing::debug;

use crate::{
    error::GraphError,
    graph::{Entity, KnowledgeGraph, Relation, RelationId},
    id::EntityId,
};

/// Outcome of [`remove_entities`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityRemoval {
    /// Identifiers of the removed entities, in draw order.
    pub removed: Vec<EntityId>,
    /// Relations removed because they touched a removed entity.
    pub cascaded_relations: usize,
}

/// Removes `min(count, |entities|)` entities chosen uniformly without
/// replacement, cascading to their incident relations.
///
/// # Errors
/// Propagates [`GraphError`] if a sampled entity cannot be removed.
pub fn remove_entities<R: Rng + ?Sized>(
    graph: &mut KnowledgeGraph,
    count: usize,
    rng: &mut R,
) -> Result<EntityRemoval, GraphError> {
    let candidates = graph.entity_ids();
    let take = count.min(candidates.len());
    let mut removal = EntityRemoval::default();
    if take == 0 {
        return Ok(removal);
    }
    for &id in candidates.choose_multiple(rng, take) {
        let (_, cascaded) = graph.remove_entity(id)?;
        removal.removed.push(id);
        removal.cascaded_relations += cascaded;
    }
    debug!(
        requested = count,
        removed = removal.removed.len(),
        cascaded = removal.cascaded_relations,
        "removed entities"
    );
    Ok(removal)
}

/// Adds `count` synthetic entities with fresh `rand_<n>` identifiers.
///
/// The suffix counter starts at one and skips any identifier already present.
///
/// # Errors
/// Propagates [`GraphError`] if insertion fails.
pub fn add_entities(graph: &mut KnowledgeGraph, count: usize) -> Result<Vec<EntityId>, GraphError> {
    let mut added = Vec::new();
    let mut cursor = 1_u64;
    while added.len() < count {
        let candidate = EntityId::Synthetic(cursor);
        cursor += 1;
        if graph.contains_entity(candidate) {
            continue;
        }
        graph.add_entity(Entity::synthetic(candidate))?;
        added.push(candidate);
    }
    debug!(added = added.len(), "added synthetic entities");
    Ok(added)
}

/// Removes `min(count, |relations|)` relations chosen uniformly without
/// replacement. Returns the number removed.
///
/// # Errors
/// Propagates [`GraphError`] if a sampled relation cannot be removed.
pub fn remove_edges<R: Rng + ?Sized>(
    graph: &mut KnowledgeGraph,
    count: usize,
    rng: &mut R,
) -> Result<usize, GraphError> {
    let candidates = graph.relation_ids();
    let take = count.min(candidates.len());
    if take == 0 {
        return Ok(0);
    }
    for &relation in candidates.choose_multiple(rng, take) {
        graph.remove_relation(relation)?;
    }
    debug!(requested = count, removed = take, "removed relations");
    Ok(take)
}

/// Adds `count` synthetic relations, each between an ordered pair of distinct
/// entities drawn uniformly at random. Self-loops are never produced.
///
/// # Errors
/// Returns [`GraphError::TooFewEntities`] when `count > 0` and the graph has
/// fewer than two entities.
pub fn add_edges<R: Rng + ?Sized>(
    graph: &mut KnowledgeGraph,
    count: usize,
    rng: &mut R,
) -> Result<Vec<RelationId>, GraphError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let endpoints = graph.entity_ids();
    if endpoints.len() < 2 {
        return Err(GraphError::TooFewEntities {
            available: endpoints.len(),
        });
    }
    let mut added = Vec::new();
    for _ in 0..count {
        let mut pair = endpoints.choose_multiple(rng, 2).copied();
        let (Some(source), Some(target)) = (pair.next(), pair.next()) else {
            return Err(GraphError::TooFewEntities {
                available: endpoints.len(),
            });
        };
        added.push(graph.add_relation(Relation::synthetic(source, target))?);
    }
    debug!(added = added.len(), "added synthetic relations");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Attributes;
    use rand::{SeedableRng, rngs::SmallRng};
    use rstest::{fixture, rstest};

    #[fixture]
    fn star() -> KnowledgeGraph {
        let hub = EntityId::Original(1);
        let entities = (1..=5).map(|n| Entity::new(EntityId::Original(n), Attributes::new()));
        let relations = (2..=5)
            .map(|n| Relation::new(hub, EntityId::Original(n), "spoke", Attributes::new()));
        KnowledgeGraph::from_parts(entities, relations).expect("star graph is valid")
    }

    #[rstest]
    #[case(0, 0)]
    #[case(2, 2)]
    #[case(5, 5)]
    #[case(50, 5)]
    fn remove_entities_clamps_to_available(
        mut star: KnowledgeGraph,
        #[case] requested: usize,
        #[case] expected: usize,
    ) {
        let mut rng = SmallRng::seed_from_u64(7);
        let removal = remove_entities(&mut star, requested, &mut rng).expect("removal succeeds");
        assert_eq!(removal.removed.len(), expected);
        assert_eq!(star.entity_count(), 5 - expected);
        for id in &removal.removed {
            assert!(!star.contains_entity(*id));
        }
    }

    #[rstest]
    fn removing_the_hub_cascades_every_spoke(mut star: KnowledgeGraph) {
        let mut rng = SmallRng::seed_from_u64(0);
        let removal = remove_entities(&mut star, 5, &mut rng).expect("removal succeeds");
        assert_eq!(removal.cascaded_relations, 4);
        assert_eq!(star.relation_count(), 0);
    }

    #[rstest]
    fn add_entities_skips_taken_suffixes(mut star: KnowledgeGraph) {
        star.add_entity(Entity::synthetic(EntityId::Synthetic(2)))
            .expect("fresh id");
        let added = add_entities(&mut star, 3).expect("insertion succeeds");
        assert_eq!(
            added,
            vec![
                EntityId::Synthetic(1),
                EntityId::Synthetic(3),
                EntityId::Synthetic(4)
            ]
        );
        for id in added {
            assert!(star.incident_relations(id).is_empty());
        }
    }

    #[rstest]
    #[case(3, 3)]
    #[case(9, 4)]
    fn remove_edges_clamps_to_available(
        mut star: KnowledgeGraph,
        #[case] requested: usize,
        #[case] expected: usize,
    ) {
        let mut rng = SmallRng::seed_from_u64(11);
        let removed = remove_edges(&mut star, requested, &mut rng).expect("removal succeeds");
        assert_eq!(removed, expected);
        assert_eq!(star.relation_count(), 4 - expected);
        assert_eq!(star.entity_count(), 5);
    }

    #[rstest]
    fn add_edges_never_produces_self_loops() {
        let mut graph = KnowledgeGraph::from_parts(
            [1, 2].map(|n| Entity::new(EntityId::Original(n), Attributes::new())),
            [],
        )
        .expect("valid graph");
        let mut rng = SmallRng::seed_from_u64(3);
        let added = add_edges(&mut graph, 64, &mut rng).expect("two endpoints available");
        assert_eq!(added.len(), 64);
        for relation in graph.relations() {
            assert_ne!(relation.source(), relation.target());
            assert!(relation.is_synthetic());
        }
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    fn add_edges_requires_two_entities(#[case] entities: u64) {
        let mut graph = KnowledgeGraph::from_parts(
            (1..=entities).map(|n| Entity::new(EntityId::Original(n), Attributes::new())),
            [],
        )
        .expect("valid graph");
        let mut rng = SmallRng::seed_from_u64(3);
        let err = add_edges(&mut graph, 1, &mut rng).expect_err("too few endpoints");
        assert_eq!(
            err,
            GraphError::TooFewEntities {
                available: usize::try_from(entities).expect("small count")
            }
        );
        assert!(add_edges(&mut graph, 0, &mut rng).expect("no-op").is_empty());
    }
}
