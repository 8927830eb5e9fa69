//! In-memory directed multi-relational graph.
//!
//! Entities and relations live in insertion-ordered slots so enumeration
//! order is stable for a given edit history. A per-entity incidence index
//! makes the cascade on entity removal explicit: incident relations are
//! collected and removed first, then the entity slot is cleared.

use std::collections::HashMap;

use serde_json::Value;

use crate::{error::GraphError, id::EntityId};

/// Ordered attribute bag carried by entities and relations.
pub type Attributes = serde_json::Map<String, Value>;

/// Attribute key holding an entity's type.
pub const TYPE_KEY: &str = "type";

/// Attribute key holding an entity's display name.
pub const NAME_KEY: &str = "name";

/// Attribute key holding an entity's description.
pub const DESCRIPTION_KEY: &str = "description";

/// Sentinel type stamped on entities minted by the add-entities operator.
pub const SYNTHETIC_ENTITY_TYPE: &str = "RandomEntity";

/// Sentinel type stamped on relations minted by the add-edges operator.
pub const SYNTHETIC_RELATION_TYPE: &str = "randomRelation";

/// Returns the text of a scalar string or the first element of a list.
///
/// # Examples
/// ```
/// use kgperturb_core::first_text;
/// use serde_json::json;
///
/// assert_eq!(first_text(&json!("Acme")), Some("Acme"));
/// assert_eq!(first_text(&json!(["Acme", "ACME Corp"])), Some("Acme"));
/// assert_eq!(first_text(&json!(7)), None);
/// ```
#[must_use]
pub fn first_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) => Some(text.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    }
}

/// A node of the knowledge graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    id: EntityId,
    attributes: Attributes,
}

impl Entity {
    /// Creates an entity with the given attribute bag.
    #[must_use]
    pub fn new(id: EntityId, attributes: Attributes) -> Self {
        Self { id, attributes }
    }

    /// Creates an entity tagged with [`SYNTHETIC_ENTITY_TYPE`].
    #[must_use]
    pub fn synthetic(id: EntityId) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(
            TYPE_KEY.to_owned(),
            Value::String(SYNTHETIC_ENTITY_TYPE.to_owned()),
        );
        Self { id, attributes }
    }

    /// Returns the entity identifier.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the attribute bag.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Returns the attribute bag for in-place edits.
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Returns the entity type, taking the first element of list-valued types.
    #[must_use]
    pub fn entity_type(&self) -> Option<&str> {
        self.attributes.get(TYPE_KEY).and_then(first_text)
    }

    /// Returns the display name, taking the first element of list-valued names.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.attributes.get(NAME_KEY).and_then(first_text)
    }

    /// Returns whether the entity was minted by the add-entities operator.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.id.is_synthetic()
    }

    pub(crate) fn with_id(self, id: EntityId) -> Self {
        Self {
            id,
            attributes: self.attributes,
        }
    }
}

/// A typed directed edge between two entities.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    source: EntityId,
    target: EntityId,
    relation_type: String,
    attributes: Attributes,
}

impl Relation {
    /// Creates a relation.
    #[must_use]
    pub fn new(
        source: EntityId,
        target: EntityId,
        relation_type: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            source,
            target,
            relation_type: relation_type.into(),
            attributes,
        }
    }

    /// Creates a relation tagged with [`SYNTHETIC_RELATION_TYPE`].
    #[must_use]
    pub fn synthetic(source: EntityId, target: EntityId) -> Self {
        Self::new(source, target, SYNTHETIC_RELATION_TYPE, Attributes::new())
    }

    /// Returns the source endpoint.
    #[must_use]
    pub fn source(&self) -> EntityId {
        self.source
    }

    /// Returns the target endpoint.
    #[must_use]
    pub fn target(&self) -> EntityId {
        self.target
    }

    /// Returns the relation type label.
    #[must_use]
    pub fn relation_type(&self) -> &str {
        &self.relation_type
    }

    /// Replaces the relation type label.
    pub fn set_relation_type(&mut self, relation_type: impl Into<String>) {
        self.relation_type = relation_type.into();
    }

    /// Returns the attribute bag.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Returns the attribute bag for in-place edits.
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Returns whether the relation was minted by the add-edges operator.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.relation_type == SYNTHETIC_RELATION_TYPE
    }

    pub(crate) fn with_endpoints(self, source: EntityId, target: EntityId) -> Self {
        Self {
            source,
            target,
            ..self
        }
    }
}

/// Stable handle to a relation slot within one [`KnowledgeGraph`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RelationId(usize);

impl RelationId {
    /// Returns the slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Directed multi-relational graph with attribute bags.
///
/// # Examples
/// ```
/// use kgperturb_core::{Attributes, Entity, EntityId, KnowledgeGraph, Relation};
///
/// let mut graph = KnowledgeGraph::new();
/// graph.add_entity(Entity::new(EntityId::Original(1), Attributes::new()))?;
/// graph.add_entity(Entity::new(EntityId::Original(2), Attributes::new()))?;
/// graph.add_relation(Relation::new(
///     EntityId::Original(1),
///     EntityId::Original(2),
///     "knows",
///     Attributes::new(),
/// ))?;
///
/// let (_, cascaded) = graph.remove_entity(EntityId::Original(2))?;
/// assert_eq!(cascaded, 1);
/// assert_eq!(graph.relation_count(), 0);
/// # Ok::<(), kgperturb_core::GraphError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct KnowledgeGraph {
    entities: Vec<Option<Entity>>,
    positions: HashMap<EntityId, usize>,
    relations: Vec<Option<Relation>>,
    incidence: HashMap<EntityId, Vec<RelationId>>,
    relation_count: usize,
}

impl KnowledgeGraph {
    /// Largest number of entities a graph can address.
    pub const MAX_ENTITIES: usize = isize::MAX.unsigned_abs() / std::mem::size_of::<Entity>();

    /// Largest number of relations a graph can address.
    pub const MAX_RELATIONS: usize = isize::MAX.unsigned_abs() / std::mem::size_of::<Relation>();

    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from loaded parts, validating identifiers and endpoints.
    ///
    /// # Errors
    /// Returns [`GraphError::DuplicateEntity`] when an identifier repeats and
    /// [`GraphError::DanglingRelation`] when a relation endpoint is missing.
    pub fn from_parts(
        entities: impl IntoIterator<Item = Entity>,
        relations: impl IntoIterator<Item = Relation>,
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for entity in entities {
            graph.add_entity(entity)?;
        }
        for relation in relations {
            graph.add_relation(relation)?;
        }
        Ok(graph)
    }

    /// Consumes the graph, returning live entities and relations in order.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Entity>, Vec<Relation>) {
        (
            self.entities.into_iter().flatten().collect(),
            self.relations.into_iter().flatten().collect(),
        )
    }

    /// Inserts an entity at the end of the enumeration order.
    ///
    /// # Errors
    /// Returns [`GraphError::DuplicateEntity`] when the identifier is taken.
    pub fn add_entity(&mut self, entity: Entity) -> Result<(), GraphError> {
        let id = entity.id();
        if self.positions.contains_key(&id) {
            return Err(GraphError::DuplicateEntity { id });
        }
        self.positions.insert(id, self.entities.len());
        self.incidence.insert(id, Vec::new());
        self.entities.push(Some(entity));
        Ok(())
    }

    /// Removes an entity together with every relation touching it.
    ///
    /// Returns the removed entity and the number of relations removed by the
    /// cascade.
    ///
    /// # Errors
    /// Returns [`GraphError::UnknownEntity`] when the identifier is absent.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<(Entity, usize), GraphError> {
        let position = *self
            .positions
            .get(&id)
            .ok_or(GraphError::UnknownEntity { id })?;
        let incident = self.incidence.get(&id).cloned().unwrap_or_default();
        let mut cascaded = 0;
        for relation in incident {
            // Handles already taken by an earlier iteration are skipped.
            if self.take_relation(relation).is_some() {
                cascaded += 1;
            }
        }
        self.incidence.remove(&id);
        self.positions.remove(&id);
        let entity = self
            .entities
            .get_mut(position)
            .and_then(Option::take)
            .ok_or(GraphError::UnknownEntity { id })?;
        Ok((entity, cascaded))
    }

    /// Inserts a relation between two existing entities.
    ///
    /// Parallel relations between the same pair are permitted.
    ///
    /// # Errors
    /// Returns [`GraphError::DanglingRelation`] when an endpoint is missing.
    pub fn add_relation(&mut self, relation: Relation) -> Result<RelationId, GraphError> {
        let (source, target) = (relation.source(), relation.target());
        for endpoint in [source, target] {
            if !self.contains_entity(endpoint) {
                return Err(GraphError::DanglingRelation {
                    source_id: source,
                    target_id: target,
                    missing: endpoint,
                });
            }
        }
        let handle = RelationId(self.relations.len());
        self.relations.push(Some(relation));
        self.relation_count += 1;
        self.incidence.entry(source).or_default().push(handle);
        if target != source {
            self.incidence.entry(target).or_default().push(handle);
        }
        Ok(handle)
    }

    /// Removes a relation.
    ///
    /// # Errors
    /// Returns [`GraphError::UnknownRelation`] when the slot is empty.
    pub fn remove_relation(&mut self, relation: RelationId) -> Result<Relation, GraphError> {
        self.take_relation(relation)
            .ok_or(GraphError::UnknownRelation {
                index: relation.index(),
            })
    }

    fn take_relation(&mut self, handle: RelationId) -> Option<Relation> {
        let relation = self.relations.get_mut(handle.index()).and_then(Option::take)?;
        self.relation_count -= 1;
        for endpoint in [relation.source(), relation.target()] {
            if let Some(handles) = self.incidence.get_mut(&endpoint) {
                handles.retain(|candidate| *candidate != handle);
            }
        }
        Some(relation)
    }

    /// Iterates live entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().flatten()
    }

    /// Iterates live relations in insertion order.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().flatten()
    }

    /// Collects live entity identifiers in insertion order.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities().map(Entity::id).collect()
    }

    /// Collects live relation handles in insertion order.
    #[must_use]
    pub fn relation_ids(&self) -> Vec<RelationId> {
        self.relations
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| RelationId(index))
            .collect()
    }

    /// Looks up an entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        let position = *self.positions.get(&id)?;
        self.entities.get(position)?.as_ref()
    }

    /// Looks up an entity for in-place attribute edits.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let position = *self.positions.get(&id)?;
        self.entities.get_mut(position)?.as_mut()
    }

    /// Looks up a relation.
    #[must_use]
    pub fn relation(&self, relation: RelationId) -> Option<&Relation> {
        self.relations.get(relation.index())?.as_ref()
    }

    /// Looks up a relation for in-place label and attribute edits.
    pub fn relation_mut(&mut self, relation: RelationId) -> Option<&mut Relation> {
        self.relations.get_mut(relation.index())?.as_mut()
    }

    /// Returns the relations touching an entity.
    #[must_use]
    pub fn incident_relations(&self, id: EntityId) -> &[RelationId] {
        self.incidence.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns whether the entity exists.
    #[must_use]
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.positions.len()
    }

    /// Returns the number of live relations.
    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.relation_count
    }

    /// Returns the largest ordinal among original identifiers, or zero.
    #[must_use]
    pub fn max_original_ordinal(&self) -> u64 {
        self.entities()
            .filter_map(|entity| match entity.id() {
                EntityId::Original(ordinal) => Some(ordinal),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Graphs compare by their live entities and relations in enumeration order.
impl PartialEq for KnowledgeGraph {
    fn eq(&self, other: &Self) -> bool {
        self.entities().eq(other.entities()) && self.relations().eq(other.relations())
    }
}
