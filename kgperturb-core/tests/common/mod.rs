#![allow(dead_code, reason = "each integration test binary uses a different subset")]

use std::cell::Cell;

use kgperturb_core::{
    Attributes, Entity, EntityId, KnowledgeGraph, Relation, RewriteError, RewriteOperation,
    TextRewriter,
};
use serde_json::{Value, json};

pub fn attributes(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an attribute object, got {other}"),
    }
}

pub fn named_entity(ordinal: u64, name: &str, entity_type: &str) -> Entity {
    Entity::new(
        EntityId::Original(ordinal),
        attributes(json!({ "name": [name], "type": [entity_type] })),
    )
}

pub fn relation(source: u64, target: u64, relation_type: &str) -> Relation {
    Relation::new(
        EntityId::Original(source),
        EntityId::Original(target),
        relation_type,
        Attributes::new(),
    )
}

/// `e1 -> e2 -> e3`.
pub fn chain_graph() -> KnowledgeGraph {
    KnowledgeGraph::from_parts(
        [
            named_entity(1, "Acme", "Organization"),
            named_entity(2, "Bolt", "Organization"),
            named_entity(3, "Lisbon", "Location"),
        ],
        [relation(1, 2, "partners_with"), relation(2, 3, "located_in")],
    )
    .expect("chain graph is valid")
}

/// A ring of `size` entities where entity `n` points at `n + 1`.
pub fn ring_graph(size: u64) -> KnowledgeGraph {
    KnowledgeGraph::from_parts(
        (1..=size).map(|n| named_entity(n, &format!("Entity {n}"), "Thing")),
        (1..=size)
            .filter(|_| size > 1)
            .map(|n| relation(n, n % size + 1, "next")),
    )
    .expect("ring graph is valid")
}

/// Rewriter that decorates text deterministically and fails for one name.
#[derive(Default)]
pub struct ScriptedRewriter {
    pub fail_on: Option<&'static str>,
    pub calls: Cell<usize>,
}

impl ScriptedRewriter {
    pub fn failing_on(name: &'static str) -> Self {
        Self {
            fail_on: Some(name),
            calls: Cell::new(0),
        }
    }

    fn check(&self, name: Option<&str>, operation: RewriteOperation) -> Result<(), RewriteError> {
        self.calls.set(self.calls.get() + 1);
        if name.is_some() && name == self.fail_on {
            return Err(RewriteError::Unsupported { operation });
        }
        Ok(())
    }
}

impl TextRewriter for ScriptedRewriter {
    fn name(&self) -> &str {
        "scripted"
    }

    fn rename_entity(&self, entity: &Entity) -> Result<Option<String>, RewriteError> {
        self.check(entity.name(), RewriteOperation::RenameEntity)?;
        Ok(entity.name().map(str::to_uppercase))
    }

    fn rename_relation(&self, relation: &Relation) -> Result<Option<String>, RewriteError> {
        self.check(None, RewriteOperation::RenameRelation)?;
        Ok(Some(format!("{}_v2", relation.relation_type())))
    }

    fn synthesize_description(&self, entity: &Entity) -> Result<Option<String>, RewriteError> {
        self.check(entity.name(), RewriteOperation::SynthesizeDescription)?;
        Ok(entity.name().map(|name| format!("{name}, described anew")))
    }
}
