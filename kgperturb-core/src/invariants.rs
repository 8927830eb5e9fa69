//! Structural checks run on a perturbed graph before it is handed back.
//!
//! The orchestrator evaluates every [`StructuralInvariant`] after
//! reassignment and fails the run with an [`InvariantViolation`] rather than
//! returning a graph that would corrupt downstream alignment data.

use std::collections::HashSet;

use thiserror::Error;

use crate::{
    graph::KnowledgeGraph,
    id::{EntityId, Namespace},
    reassign::EntityMapping,
};

/// Enumerates the checks applied to a perturbation result.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StructuralInvariant {
    /// Every relation endpoint resolves to a live entity.
    ReferentialIntegrity,
    /// Output identifiers live in the reassigned or synthetic namespace.
    OutputNamespaces,
    /// Rendered mapping keys, mapping values and added identifiers are
    /// pairwise disjoint.
    MappingDisjointness,
    /// `|output| = |input| - |removed| + |added|`.
    EntityCount,
}

impl StructuralInvariant {
    /// Returns all invariants in evaluation order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [
            Self::ReferentialIntegrity,
            Self::OutputNamespaces,
            Self::MappingDisjointness,
            Self::EntityCount,
        ]
    }
}

/// Reports the first invariant that did not hold.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum InvariantViolation {
    /// A relation endpoint is missing from the graph.
    #[error("relation `{source_id}` -> `{target_id}` references missing entity `{missing}`")]
    DanglingEndpoint {
        /// Source endpoint.
        source_id: EntityId,
        /// Target endpoint.
        target_id: EntityId,
        /// Endpoint that did not resolve.
        missing: EntityId,
    },
    /// An output identifier kept its original namespace.
    #[error("output entity `{id}` is in the {namespace} namespace")]
    UnexpectedNamespace {
        /// Offending identifier.
        id: EntityId,
        /// Namespace it belongs to.
        namespace: Namespace,
    },
    /// A mapping value renders the same as a mapping key.
    #[error("mapping value `{id}` renders the same as a mapping key")]
    MappingOverlap {
        /// Shared identifier.
        id: EntityId,
    },
    /// A mapping value renders the same as an added entity.
    #[error("mapping value `{id}` renders the same as an added entity")]
    AddedOverlap {
        /// Shared identifier.
        id: EntityId,
    },
    /// The output entity count does not match the edit arithmetic.
    #[error("expected {expected} entities after perturbation, found {actual}")]
    EntityCount {
        /// Count implied by the structural edits.
        expected: usize,
        /// Count found in the output graph.
        actual: usize,
    },
}

/// Inputs describing one perturbation result.
#[derive(Clone, Copy, Debug)]
pub struct PerturbationSnapshot<'a> {
    /// Perturbed graph.
    pub graph: &'a KnowledgeGraph,
    /// Survivor mapping.
    pub mapping: &'a EntityMapping,
    /// Identifiers minted by the add-entities operator.
    pub added: &'a [EntityId],
    /// Entity count of the input graph.
    pub input_entities: usize,
    /// Number of entities removed.
    pub removed_entities: usize,
}

impl PerturbationSnapshot<'_> {
    /// Evaluates a single invariant.
    ///
    /// # Errors
    /// Returns the [`InvariantViolation`] describing the first failure.
    pub fn check(&self, invariant: StructuralInvariant) -> Result<(), InvariantViolation> {
        match invariant {
            StructuralInvariant::ReferentialIntegrity => self.check_referential_integrity(),
            StructuralInvariant::OutputNamespaces => self.check_output_namespaces(),
            StructuralInvariant::MappingDisjointness => self.check_mapping_disjointness(),
            StructuralInvariant::EntityCount => self.check_entity_count(),
        }
    }

    /// Evaluates every invariant in [`StructuralInvariant::all`] order.
    ///
    /// # Errors
    /// Returns the first [`InvariantViolation`] encountered.
    pub fn check_all(&self) -> Result<(), InvariantViolation> {
        StructuralInvariant::all()
            .into_iter()
            .try_for_each(|invariant| self.check(invariant))
    }

    fn check_referential_integrity(&self) -> Result<(), InvariantViolation> {
        for relation in self.graph.relations() {
            for endpoint in [relation.source(), relation.target()] {
                if !self.graph.contains_entity(endpoint) {
                    return Err(InvariantViolation::DanglingEndpoint {
                        source_id: relation.source(),
                        target_id: relation.target(),
                        missing: endpoint,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_output_namespaces(&self) -> Result<(), InvariantViolation> {
        match self
            .graph
            .entities()
            .map(|entity| entity.id())
            .find(|id| id.namespace() == Namespace::Original)
        {
            Some(id) => Err(InvariantViolation::UnexpectedNamespace {
                id,
                namespace: id.namespace(),
            }),
            None => Ok(()),
        }
    }

    // Original and reassigned identifiers share the `e<n>` rendering, so the
    // comparison runs on rendered strings rather than on `EntityId` values.
    fn check_mapping_disjointness(&self) -> Result<(), InvariantViolation> {
        let keys: HashSet<String> = self.mapping.keys().map(|id| id.to_string()).collect();
        let added: HashSet<String> = self.added.iter().map(ToString::to_string).collect();
        for value in self.mapping.values() {
            let rendered = value.to_string();
            if keys.contains(&rendered) {
                return Err(InvariantViolation::MappingOverlap { id: value });
            }
            if added.contains(&rendered) {
                return Err(InvariantViolation::AddedOverlap { id: value });
            }
        }
        Ok(())
    }

    fn check_entity_count(&self) -> Result<(), InvariantViolation> {
        let expected = self
            .input_entities
            .saturating_add(self.added.len())
            .saturating_sub(self.removed_entities);
        let actual = self.graph.entity_count();
        if expected == actual {
            Ok(())
        } else {
            Err(InvariantViolation::EntityCount { expected, actual })
        }
    }
}
