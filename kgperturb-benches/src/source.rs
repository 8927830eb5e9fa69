//! Seeded synthetic knowledge graphs for benchmarking.
//!
//! Entities carry a type, a name and a short description; relations connect
//! distinct entities drawn uniformly at random and use a small vocabulary of
//! relation types, roughly matching extracted company graphs.

use kgperturb_core::{
    Attributes, DESCRIPTION_KEY, Entity, EntityId, GraphError, KnowledgeGraph, NAME_KEY, Relation,
    TYPE_KEY,
};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde_json::{Value, json};

const ENTITY_TYPES: [&str; 5] = ["Company", "Person", "Product", "Location", "FinancialMetric"];
const RELATION_TYPES: [&str; 6] = [
    "employs",
    "makes",
    "locatedIn",
    "reports",
    "acquired",
    "partnersWith",
];

/// Errors that may occur during synthetic graph generation.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum SyntheticGraphError {
    /// Relations were requested for a graph with fewer than two entities.
    #[error("relations need at least two entities, got {entity_count}")]
    TooFewEntities {
        /// Requested entity count.
        entity_count: usize,
    },
    /// The generated parts did not form a valid graph.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Configuration for synthetic graph generation.
#[derive(Clone, Debug)]
pub struct SyntheticGraphConfig {
    /// Number of entities, identified `e1..=eN`.
    pub entity_count: usize,
    /// Relations generated per entity.
    pub relations_per_entity: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

/// Generates a graph from `config`.
///
/// # Errors
/// Returns [`SyntheticGraphError::TooFewEntities`] when relations are
/// requested for fewer than two entities.
///
/// # Examples
/// ```
/// use kgperturb_benches::source::{SyntheticGraphConfig, generate_graph};
///
/// let config = SyntheticGraphConfig { entity_count: 10, relations_per_entity: 2, seed: 7 };
/// let graph = generate_graph(&config).expect("valid config");
/// assert_eq!(graph.entity_count(), 10);
/// assert_eq!(graph.relation_count(), 20);
/// ```
pub fn generate_graph(
    config: &SyntheticGraphConfig,
) -> Result<KnowledgeGraph, SyntheticGraphError> {
    let relation_count = config
        .entity_count
        .saturating_mul(config.relations_per_entity);
    if config.relations_per_entity > 0 && config.entity_count < 2 {
        return Err(SyntheticGraphError::TooFewEntities {
            entity_count: config.entity_count,
        });
    }

    let mut rng = SmallRng::seed_from_u64(config.seed);
    let ordinals = 1..=u64::try_from(config.entity_count).unwrap_or(u64::MAX);
    let entities: Vec<Entity> = ordinals
        .clone()
        .map(|ordinal| synthetic_entity(ordinal, &mut rng))
        .collect();

    let upper = *ordinals.end();
    let relations: Vec<Relation> = (0..relation_count)
        .map(|_| {
            let source = rng.gen_range(1..=upper);
            let mut target = rng.gen_range(1..upper);
            if target >= source {
                target += 1;
            }
            let label = RELATION_TYPES
                .get(rng.gen_range(0..RELATION_TYPES.len()))
                .copied()
                .unwrap_or_default();
            Relation::new(
                EntityId::Original(source),
                EntityId::Original(target),
                label,
                Attributes::new(),
            )
        })
        .collect();

    Ok(KnowledgeGraph::from_parts(entities, relations)?)
}

fn synthetic_entity(ordinal: u64, rng: &mut SmallRng) -> Entity {
    let entity_type = ENTITY_TYPES
        .get(rng.gen_range(0..ENTITY_TYPES.len()))
        .copied()
        .unwrap_or_default();
    let mut attributes = Attributes::new();
    attributes.insert(TYPE_KEY.to_owned(), json!([entity_type]));
    attributes.insert(
        NAME_KEY.to_owned(),
        json!([format!("{entity_type} {ordinal}")]),
    );
    attributes.insert(
        DESCRIPTION_KEY.to_owned(),
        Value::String(format!("Synthetic {} number {ordinal}", entity_type.to_lowercase())),
    );
    Entity::new(EntityId::Original(ordinal), attributes)
}
