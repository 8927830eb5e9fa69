//! Builder utilities for configuring perturbation runs.
//!
//! Collects operator counts, content-pass toggles and the random seed, and
//! validates them before constructing a [`Perturbator`].

use crate::{
    error::{PerturbError, Result},
    hooks::{DescriptionPolicy, RewriteOperation},
    perturbator::Perturbator,
};

/// Operator counts and content-pass toggles for one run.
///
/// Counts default to zero and toggles to `false`, so the default plan leaves
/// the structure untouched apart from identifier reassignment.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PerturbationPlan {
    /// Entities to remove, clamped to the graph size.
    pub remove_entities: usize,
    /// Synthetic entities to add.
    pub add_entities: usize,
    /// Relations to remove, clamped to the relation count.
    pub remove_edges: usize,
    /// Synthetic relations to add.
    pub add_edges: usize,
    /// Run the entity rename pass.
    pub rename_entities: bool,
    /// Run the relation rename pass.
    pub rename_relations: bool,
    /// Run the description synthesis pass.
    pub synthesize_descriptions: bool,
}

impl PerturbationPlan {
    /// Returns the enabled content passes in pipeline order.
    #[must_use]
    pub fn content_operations(&self) -> Vec<RewriteOperation> {
        [
            (self.rename_entities, RewriteOperation::RenameEntity),
            (self.rename_relations, RewriteOperation::RenameRelation),
            (
                self.synthesize_descriptions,
                RewriteOperation::SynthesizeDescription,
            ),
        ]
        .into_iter()
        .filter_map(|(enabled, operation)| enabled.then_some(operation))
        .collect()
    }

    /// Entity count left after the entity operators run on `entities` inputs.
    #[must_use]
    pub fn projected_entities(&self, entities: usize) -> usize {
        (entities - self.remove_entities.min(entities)).saturating_add(self.add_entities)
    }
}

/// Configures and constructs [`Perturbator`] instances.
///
/// # Examples
/// ```
/// use kgperturb_core::PerturbatorBuilder;
///
/// let perturbator = PerturbatorBuilder::new()
///     .with_seed(42)
///     .with_remove_entities(1)
///     .with_add_edges(2)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(perturbator.seed(), Some(42));
/// assert_eq!(perturbator.plan().add_edges, 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct PerturbatorBuilder {
    seed: Option<u64>,
    plan: PerturbationPlan,
    description_policy: DescriptionPolicy,
}

impl PerturbatorBuilder {
    /// Creates a builder with an empty plan and no seed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the random seed so structural edits are reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets or clears the random seed.
    #[must_use]
    pub fn with_optional_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Replaces the whole plan.
    #[must_use]
    pub fn with_plan(mut self, plan: PerturbationPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Sets the number of entities to remove.
    #[must_use]
    pub fn with_remove_entities(mut self, count: usize) -> Self {
        self.plan.remove_entities = count;
        self
    }

    /// Sets the number of synthetic entities to add.
    #[must_use]
    pub fn with_add_entities(mut self, count: usize) -> Self {
        self.plan.add_entities = count;
        self
    }

    /// Sets the number of relations to remove.
    #[must_use]
    pub fn with_remove_edges(mut self, count: usize) -> Self {
        self.plan.remove_edges = count;
        self
    }

    /// Sets the number of synthetic relations to add.
    #[must_use]
    pub fn with_add_edges(mut self, count: usize) -> Self {
        self.plan.add_edges = count;
        self
    }

    /// Toggles the entity rename pass.
    #[must_use]
    pub fn with_rename_entities(mut self, enabled: bool) -> Self {
        self.plan.rename_entities = enabled;
        self
    }

    /// Toggles the relation rename pass.
    #[must_use]
    pub fn with_rename_relations(mut self, enabled: bool) -> Self {
        self.plan.rename_relations = enabled;
        self
    }

    /// Toggles the description synthesis pass.
    #[must_use]
    pub fn with_synthesize_descriptions(mut self, enabled: bool) -> Self {
        self.plan.synthesize_descriptions = enabled;
        self
    }

    /// Chooses where synthesized descriptions are written.
    #[must_use]
    pub fn with_description_policy(mut self, policy: DescriptionPolicy) -> Self {
        self.description_policy = policy;
        self
    }

    /// Returns the configured plan.
    #[must_use]
    pub fn plan(&self) -> &PerturbationPlan {
        &self.plan
    }

    /// Validates the configuration and constructs a [`Perturbator`].
    ///
    /// # Errors
    /// Returns [`PerturbError::InertDescriptionPolicy`] when description
    /// synthesis is enabled but the policy writes nowhere.
    pub fn build(self) -> Result<Perturbator> {
        if self.plan.synthesize_descriptions && !self.description_policy.writes_anything() {
            return Err(PerturbError::InertDescriptionPolicy);
        }
        Ok(Perturbator::new(
            self.seed,
            self.plan,
            self.description_policy,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(5, 2, 0, 3)]
    #[case(5, 9, 0, 0)]
    #[case(0, 3, 2, 2)]
    #[case(2, 2, 1, 1)]
    fn projected_entities_clamps_removal(
        #[case] entities: usize,
        #[case] remove: usize,
        #[case] add: usize,
        #[case] expected: usize,
    ) {
        let plan = PerturbationPlan {
            remove_entities: remove,
            add_entities: add,
            ..PerturbationPlan::default()
        };
        assert_eq!(plan.projected_entities(entities), expected);
    }

    #[rstest]
    fn content_operations_follow_pipeline_order() {
        let plan = PerturbationPlan {
            rename_relations: true,
            synthesize_descriptions: true,
            ..PerturbationPlan::default()
        };
        assert_eq!(
            plan.content_operations(),
            vec![
                RewriteOperation::RenameRelation,
                RewriteOperation::SynthesizeDescription
            ]
        );
    }

    #[rstest]
    fn inert_description_policy_is_rejected() {
        let err = PerturbatorBuilder::new()
            .with_synthesize_descriptions(true)
            .with_description_policy(DescriptionPolicy {
                update_description: false,
                update_name: false,
            })
            .build()
            .expect_err("policy writes nothing");
        assert_eq!(err, PerturbError::InertDescriptionPolicy);
    }

    #[rstest]
    fn inert_policy_is_accepted_when_pass_is_disabled() {
        let perturbator = PerturbatorBuilder::new()
            .with_description_policy(DescriptionPolicy {
                update_description: false,
                update_name: false,
            })
            .build()
            .expect("pass is disabled");
        assert_eq!(perturbator.seed(), None);
    }
}
