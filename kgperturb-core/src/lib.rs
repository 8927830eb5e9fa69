//! Knowledge-graph perturbation engine.
//!
//! Applies seeded structural edits to a [`KnowledgeGraph`], moves surviving
//! entities into a fresh identifier namespace, and optionally runs content
//! passes through a pluggable [`TextRewriter`].

mod builder;
mod error;
mod graph;
mod hooks;
mod id;
mod invariants;
pub mod operators;
mod perturbator;
mod reassign;

#[cfg(test)]
mod test_utils;

pub use crate::{
    builder::{PerturbationPlan, PerturbatorBuilder},
    error::{GraphError, GraphErrorCode, PerturbError, PerturbErrorCode, Result},
    graph::{
        Attributes, DESCRIPTION_KEY, Entity, KnowledgeGraph, NAME_KEY, Relation, RelationId,
        SYNTHETIC_ENTITY_TYPE, SYNTHETIC_RELATION_TYPE, TYPE_KEY, first_text,
    },
    hooks::{
        ContentReport, DescriptionPolicy, PassReport, RewriteError, RewriteOperation,
        TextRewriter, rename_entities, rename_relations, synthesize_descriptions,
    },
    id::{ENTITY_PREFIX, EntityId, IdParseError, Namespace, SYNTHETIC_PREFIX},
    invariants::{InvariantViolation, PerturbationSnapshot, StructuralInvariant},
    perturbator::{PerturbationOutcome, Perturbator},
    reassign::{EntityMapping, MappingError, Reassignment, reassign_entity_ids},
};
