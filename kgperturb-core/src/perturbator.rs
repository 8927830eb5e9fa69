//! Orchestration of a single perturbation run.

use rand::{SeedableRng, rngs::SmallRng};
use tracing::{info, instrument, warn};

use crate::{
    builder::PerturbationPlan,
    error::{PerturbError, Result},
    graph::KnowledgeGraph,
    hooks::{
        ContentReport, DescriptionPolicy, RewriteOperation, TextRewriter, rename_entities,
        rename_relations, synthesize_descriptions,
    },
    id::{EntityId, Namespace},
    invariants::PerturbationSnapshot,
    operators,
    reassign::{EntityMapping, reassign_entity_ids},
};

/// Everything a perturbation run produces.
#[derive(Clone, Debug, PartialEq)]
pub struct PerturbationOutcome {
    /// Perturbed graph in the reassigned and synthetic namespaces.
    pub graph: KnowledgeGraph,
    /// Survivor mapping from original to reassigned identifiers.
    pub mapping: EntityMapping,
    /// Entities removed by the remove-entities operator, in draw order.
    pub removed_entities: Vec<EntityId>,
    /// Entities minted by the add-entities operator.
    pub added_entities: Vec<EntityId>,
    /// Relations removed by the remove-edges operator.
    pub removed_relations: usize,
    /// Relations removed because an endpoint entity was removed.
    pub cascaded_relations: usize,
    /// Relations minted by the add-edges operator.
    pub added_relations: usize,
    /// Relations dropped during reassignment.
    pub dropped_relations: usize,
    /// Content pass counters.
    pub content: ContentReport,
}

/// Runs the perturbation pipeline.
///
/// The stages run in a fixed order: remove entities, add entities, remove
/// edges, add edges, identifier reassignment, then the enabled content passes
/// (entity rename, relation rename, description synthesis). All structural
/// randomness comes from one generator seeded at the start of the run.
///
/// # Examples
/// ```
/// use kgperturb_core::{Attributes, Entity, EntityId, KnowledgeGraph, PerturbatorBuilder};
///
/// let graph = KnowledgeGraph::from_parts(
///     (1..=3).map(|n| Entity::new(EntityId::Original(n), Attributes::new())),
///     [],
/// )?;
/// let perturbator = PerturbatorBuilder::new().with_seed(7).with_add_entities(1).build()?;
/// let outcome = perturbator.perturb(graph, None)?;
/// assert_eq!(outcome.graph.entity_count(), 4);
/// assert_eq!(outcome.mapping.get(EntityId::Original(1)), Some(EntityId::Reassigned(4)));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct Perturbator {
    seed: Option<u64>,
    plan: PerturbationPlan,
    description_policy: DescriptionPolicy,
}

impl Perturbator {
    pub(crate) fn new(
        seed: Option<u64>,
        plan: PerturbationPlan,
        description_policy: DescriptionPolicy,
    ) -> Self {
        Self {
            seed,
            plan,
            description_policy,
        }
    }

    /// Returns the configured seed.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns the configured plan.
    #[must_use]
    pub fn plan(&self) -> &PerturbationPlan {
        &self.plan
    }

    /// Returns where synthesized descriptions are written.
    #[must_use]
    pub fn description_policy(&self) -> DescriptionPolicy {
        self.description_policy
    }

    /// Perturbs `graph` and returns the rewritten graph with its mapping.
    ///
    /// Every precondition is checked before the first edit, so an error never
    /// leaves a half-mutated result behind.
    ///
    /// # Errors
    /// Returns [`PerturbError::UnexpectedNamespace`] when the input holds
    /// non-original identifiers, [`PerturbError::RewriterUnavailable`] when a
    /// content pass is enabled without a rewriter,
    /// [`PerturbError::CapacityExceeded`] when an add count would grow the
    /// graph past [`KnowledgeGraph::MAX_ENTITIES`] or
    /// [`KnowledgeGraph::MAX_RELATIONS`],
    /// [`PerturbError::InsufficientEntitiesForEdges`] when relations are
    /// requested for a graph that will hold fewer than two entities, and
    /// [`PerturbError::Invariant`] if the result fails a structural check.
    #[instrument(
        name = "core.perturb",
        err,
        skip(self, graph, rewriter),
        fields(
            entities = graph.entity_count(),
            relations = graph.relation_count(),
            seed = ?self.seed,
            rewriter = rewriter.map(|backend| backend.name()),
        ),
    )]
    pub fn perturb(
        &self,
        mut graph: KnowledgeGraph,
        rewriter: Option<&dyn TextRewriter>,
    ) -> Result<PerturbationOutcome> {
        self.check_preconditions(&graph, rewriter.is_some())?;

        let input_entities = graph.entity_count();
        let base = u64::try_from(input_entities)
            .unwrap_or(u64::MAX)
            .max(graph.max_original_ordinal());

        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                warn!("no seed configured; structural edits are not reproducible");
                SmallRng::from_entropy()
            }
        };

        let removal = operators::remove_entities(&mut graph, self.plan.remove_entities, &mut rng)?;
        let added_entities = operators::add_entities(&mut graph, self.plan.add_entities)?;
        let removed_relations =
            operators::remove_edges(&mut graph, self.plan.remove_edges, &mut rng)?;
        let added_relations =
            operators::add_edges(&mut graph, self.plan.add_edges, &mut rng)?.len();

        let reassignment =
            reassign_entity_ids(graph, &removal.removed, &added_entities, base)?;
        PerturbationSnapshot {
            graph: &reassignment.graph,
            mapping: &reassignment.mapping,
            added: &added_entities,
            input_entities,
            removed_entities: removal.removed.len(),
        }
        .check_all()?;

        let mut graph = reassignment.graph;
        let content = match rewriter {
            Some(rewriter) => self.run_content_passes(&mut graph, rewriter),
            None => ContentReport::default(),
        };

        info!(
            removed_entities = removal.removed.len(),
            added_entities = added_entities.len(),
            removed_relations,
            added_relations,
            mapped = reassignment.mapping.len(),
            "perturbation completed"
        );
        Ok(PerturbationOutcome {
            graph,
            mapping: reassignment.mapping,
            removed_entities: removal.removed,
            added_entities,
            removed_relations,
            cascaded_relations: removal.cascaded_relations,
            added_relations,
            dropped_relations: reassignment.dropped_relations,
            content,
        })
    }

    fn check_preconditions(&self, graph: &KnowledgeGraph, has_rewriter: bool) -> Result<()> {
        if let Some(id) = graph
            .entities()
            .map(|entity| entity.id())
            .find(|id| id.namespace() != Namespace::Original)
        {
            return Err(PerturbError::UnexpectedNamespace {
                id,
                namespace: id.namespace(),
            });
        }

        if !has_rewriter
            && let Some(operation) = self.plan.content_operations().first().copied()
        {
            return Err(PerturbError::RewriterUnavailable { operation });
        }

        check_capacity(
            "entities",
            self.plan.add_entities,
            graph.entity_count(),
            KnowledgeGraph::MAX_ENTITIES,
        )?;
        check_capacity(
            "relations",
            self.plan.add_edges,
            graph.relation_count(),
            KnowledgeGraph::MAX_RELATIONS,
        )?;

        let projected = self.plan.projected_entities(graph.entity_count());
        if self.plan.add_edges > 0 && projected < 2 {
            return Err(PerturbError::InsufficientEntitiesForEdges {
                requested: self.plan.add_edges,
                projected,
            });
        }
        Ok(())
    }

    fn run_content_passes(
        &self,
        graph: &mut KnowledgeGraph,
        rewriter: &dyn TextRewriter,
    ) -> ContentReport {
        let mut report = ContentReport::default();
        for operation in self.plan.content_operations() {
            match operation {
                RewriteOperation::RenameEntity => {
                    report.rename_entities = Some(rename_entities(graph, rewriter));
                }
                RewriteOperation::RenameRelation => {
                    report.rename_relations = Some(rename_relations(graph, rewriter));
                }
                RewriteOperation::SynthesizeDescription => {
                    report.synthesize_descriptions = Some(synthesize_descriptions(
                        graph,
                        rewriter,
                        self.description_policy,
                    ));
                }
            }
        }
        report
    }
}

fn check_capacity(
    items: &'static str,
    requested: usize,
    existing: usize,
    limit: usize,
) -> Result<()> {
    if requested > limit.saturating_sub(existing) {
        return Err(PerturbError::CapacityExceeded {
            items,
            requested,
            existing,
            limit,
        });
    }
    Ok(())
}
