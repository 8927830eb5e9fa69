//! Tests for the `Perturbator` orchestration API.

mod common;

use std::collections::HashSet;

use common::{ScriptedRewriter, chain_graph, ring_graph};
use kgperturb_core::{
    DescriptionPolicy, Entity, EntityId, KnowledgeGraph, Namespace, PerturbError,
    PerturbationOutcome, PerturbatorBuilder, RewriteOperation, SYNTHETIC_ENTITY_TYPE,
    SYNTHETIC_RELATION_TYPE,
};
use kgperturb_test_support::tracing::RecordingLayer;
use rstest::rstest;
use serde_json::json;
use tracing::Level;

fn run(builder: PerturbatorBuilder, graph: KnowledgeGraph) -> PerturbationOutcome {
    builder
        .build()
        .expect("configuration must be valid")
        .perturb(graph, None)
        .expect("perturbation must succeed")
}

#[rstest]
fn removing_the_middle_entity_drops_both_relations() {
    let outcome = (0..256)
        .map(|seed| {
            run(
                PerturbatorBuilder::new().with_seed(seed).with_remove_entities(1),
                chain_graph(),
            )
        })
        .find(|outcome| outcome.removed_entities == [EntityId::Original(2)])
        .expect("some seed must remove e2");

    assert_eq!(outcome.graph.relation_count(), 0);
    assert_eq!(outcome.cascaded_relations, 2);
    assert_eq!(
        outcome.graph.entity_ids(),
        vec![EntityId::Reassigned(4), EntityId::Reassigned(5)]
    );
    let pairs: Vec<_> = outcome.mapping.iter().collect();
    assert_eq!(
        pairs,
        vec![
            (EntityId::Original(1), EntityId::Reassigned(4)),
            (EntityId::Original(3), EntityId::Reassigned(5)),
        ]
    );
    let survivor = outcome
        .graph
        .entity(EntityId::Reassigned(5))
        .expect("e5 exists");
    assert_eq!(survivor.name(), Some("Lisbon"));
}

#[rstest]
fn added_entities_are_isolated_and_unmapped() {
    let outcome = run(
        PerturbatorBuilder::new().with_seed(1).with_add_entities(2),
        chain_graph(),
    );

    assert_eq!(
        outcome.added_entities,
        vec![EntityId::Synthetic(1), EntityId::Synthetic(2)]
    );
    assert_eq!(outcome.graph.entity_count(), 5);
    assert_eq!(outcome.mapping.len(), 3);
    for id in &outcome.added_entities {
        let entity = outcome.graph.entity(*id).expect("synthetic entity exists");
        assert_eq!(entity.entity_type(), Some(SYNTHETIC_ENTITY_TYPE));
        assert!(outcome.graph.incident_relations(*id).is_empty());
        assert!(outcome.mapping.values().all(|value| value != *id));
    }
    let rendered: Vec<String> = outcome
        .graph
        .entity_ids()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(rendered, ["rand_1", "rand_2", "e4", "e5", "e6"]);
}

#[rstest]
fn added_relation_on_two_entities_is_never_a_self_loop() {
    for seed in 0..64 {
        let outcome = run(
            PerturbatorBuilder::new().with_seed(seed).with_add_edges(1),
            ring_graph(2),
        );
        let synthetic: Vec<_> = outcome
            .graph
            .relations()
            .filter(|relation| relation.relation_type() == SYNTHETIC_RELATION_TYPE)
            .collect();
        assert_eq!(synthetic.len(), 1);
        assert_ne!(synthetic[0].source(), synthetic[0].target());
    }
}

#[rstest]
#[case::removes_everything(2, 0)]
#[case::removes_all_but_one(1, 0)]
fn add_edges_without_two_endpoints_fails_before_mutation(
    #[case] remove: usize,
    #[case] add: usize,
) {
    let err = PerturbatorBuilder::new()
        .with_seed(3)
        .with_remove_entities(remove)
        .with_add_entities(add)
        .with_add_edges(1)
        .build()
        .expect("configuration must be valid")
        .perturb(ring_graph(2), None)
        .expect_err("too few endpoints");
    assert!(matches!(
        err,
        PerturbError::InsufficientEntitiesForEdges { requested: 1, .. }
    ));
}

#[rstest]
#[case::entities(usize::MAX / 2, 0, "entities", 3)]
#[case::relations(0, usize::MAX, "relations", 2)]
fn oversized_add_counts_are_rejected(
    #[case] add_entities: usize,
    #[case] add_edges: usize,
    #[case] expected_items: &str,
    #[case] expected_existing: usize,
) {
    let err = PerturbatorBuilder::new()
        .with_seed(1)
        .with_add_entities(add_entities)
        .with_add_edges(add_edges)
        .build()
        .expect("configuration must be valid")
        .perturb(chain_graph(), None)
        .expect_err("the graph cannot address that many items");
    let PerturbError::CapacityExceeded {
        items,
        existing,
        limit,
        ..
    } = err
    else {
        panic!("expected a capacity error, got {err:?}");
    };
    assert_eq!(items, expected_items);
    assert_eq!(existing, expected_existing);
    assert!(limit < usize::MAX / 2);
}

#[rstest]
fn synthetic_entities_can_supply_edge_endpoints() {
    let outcome = run(
        PerturbatorBuilder::new()
            .with_seed(5)
            .with_remove_entities(2)
            .with_add_entities(2)
            .with_add_edges(3),
        ring_graph(2),
    );
    assert!(outcome.mapping.is_empty());
    assert_eq!(outcome.added_relations, 3);
    assert_eq!(outcome.graph.relation_count(), 3);
}

#[rstest]
fn removal_counts_are_clamped() {
    let outcome = run(
        PerturbatorBuilder::new()
            .with_seed(9)
            .with_remove_entities(10)
            .with_remove_edges(10),
        chain_graph(),
    );
    assert_eq!(outcome.removed_entities.len(), 3);
    assert_eq!(outcome.graph.entity_count(), 0);
    assert!(outcome.mapping.is_empty());
}

#[rstest]
fn identical_seeds_reproduce_structural_edits() {
    let builder = PerturbatorBuilder::new()
        .with_seed(2024)
        .with_remove_entities(3)
        .with_add_entities(2)
        .with_remove_edges(2)
        .with_add_edges(4);
    let first = run(builder.clone(), ring_graph(12));
    let second = run(builder, ring_graph(12));
    assert_eq!(first, second);
}

#[rstest]
fn content_passes_do_not_change_structure() {
    let builder = PerturbatorBuilder::new()
        .with_seed(77)
        .with_remove_entities(2)
        .with_add_entities(1)
        .with_add_edges(2);
    let plain = run(builder.clone(), ring_graph(8));

    let rewriter = ScriptedRewriter::default();
    let rewritten = builder
        .with_rename_entities(true)
        .with_rename_relations(true)
        .with_synthesize_descriptions(true)
        .build()
        .expect("configuration must be valid")
        .perturb(ring_graph(8), Some(&rewriter))
        .expect("perturbation must succeed");

    assert_eq!(plain.mapping, rewritten.mapping);
    assert_eq!(plain.graph.entity_ids(), rewritten.graph.entity_ids());
    let endpoints = |outcome: &PerturbationOutcome| -> Vec<(EntityId, EntityId)> {
        outcome
            .graph
            .relations()
            .map(|relation| (relation.source(), relation.target()))
            .collect()
    };
    assert_eq!(endpoints(&plain), endpoints(&rewritten));
    assert_eq!(rewritten.content.entities_renamed(), 6);
    assert_eq!(rewritten.content.descriptions_synthesized(), 6);
    assert_eq!(rewritten.content.failures(), 0);
}

#[rstest]
fn content_passes_run_after_reassignment() {
    let rewriter = ScriptedRewriter::default();
    let outcome = PerturbatorBuilder::new()
        .with_seed(1)
        .with_rename_entities(true)
        .with_synthesize_descriptions(true)
        .with_description_policy(DescriptionPolicy::default())
        .build()
        .expect("configuration must be valid")
        .perturb(chain_graph(), Some(&rewriter))
        .expect("perturbation must succeed");

    let acme = outcome
        .graph
        .entity(EntityId::Reassigned(4))
        .expect("reassigned e1 exists");
    assert_eq!(acme.attributes()["name"], json!(["ACME"]));
    assert_eq!(acme.attributes()["description"], json!(["ACME, described anew"]));
}

#[rstest]
fn rewriter_failures_skip_only_the_failing_entity() {
    let rewriter = ScriptedRewriter::failing_on("Bolt");
    let outcome = PerturbatorBuilder::new()
        .with_seed(1)
        .with_rename_entities(true)
        .build()
        .expect("configuration must be valid")
        .perturb(chain_graph(), Some(&rewriter))
        .expect("failures are not fatal");

    let names: Vec<_> = outcome.graph.entities().filter_map(Entity::name).collect();
    assert_eq!(names, ["ACME", "Bolt", "LISBON"]);
    assert_eq!(outcome.content.failures(), 1);
    assert_eq!(outcome.content.entities_renamed(), 2);
}

#[rstest]
#[case::entities(true, false, false, RewriteOperation::RenameEntity)]
#[case::relations(false, true, true, RewriteOperation::RenameRelation)]
#[case::descriptions(false, false, true, RewriteOperation::SynthesizeDescription)]
fn content_pass_without_rewriter_is_rejected(
    #[case] rename_entities: bool,
    #[case] rename_relations: bool,
    #[case] descriptions: bool,
    #[case] expected: RewriteOperation,
) {
    let err = PerturbatorBuilder::new()
        .with_seed(1)
        .with_rename_entities(rename_entities)
        .with_rename_relations(rename_relations)
        .with_synthesize_descriptions(descriptions)
        .build()
        .expect("configuration must be valid")
        .perturb(chain_graph(), None)
        .expect_err("rewriter is required");
    assert_eq!(err, PerturbError::RewriterUnavailable { operation: expected });
}

#[rstest]
fn non_original_input_identifiers_are_rejected() {
    let mut graph = chain_graph();
    graph
        .add_entity(Entity::synthetic(EntityId::Synthetic(1)))
        .expect("fresh id");
    let err = PerturbatorBuilder::new()
        .with_seed(1)
        .build()
        .expect("configuration must be valid")
        .perturb(graph, None)
        .expect_err("synthetic input ids are rejected");
    assert_eq!(
        err,
        PerturbError::UnexpectedNamespace {
            id: EntityId::Synthetic(1),
            namespace: Namespace::Synthetic,
        }
    );
}

#[rstest]
fn sparse_inputs_reassign_above_the_largest_ordinal() {
    let graph = KnowledgeGraph::from_parts(
        [
            common::named_entity(2, "Two", "Thing"),
            common::named_entity(10, "Ten", "Thing"),
        ],
        [],
    )
    .expect("valid graph");
    let outcome = run(PerturbatorBuilder::new().with_seed(1), graph);
    let values: HashSet<_> = outcome.mapping.values().collect();
    assert_eq!(
        values,
        HashSet::from([EntityId::Reassigned(11), EntityId::Reassigned(12)])
    );
}

#[rstest]
fn perturb_emits_core_span() {
    let layer = RecordingLayer::default();
    {
        let _guard = layer.install();
        run(
            PerturbatorBuilder::new().with_seed(4).with_remove_entities(1),
            chain_graph(),
        );
    }

    let span = layer.span_named("core.perturb").expect("core.perturb span");
    assert_eq!(span.fields.get("entities").map(String::as_str), Some("3"));
    assert_eq!(span.fields.get("seed").map(String::as_str), Some("Some(4)"));
    assert!(
        layer
            .events_at(Level::INFO)
            .iter()
            .any(|event| event.field("message") == Some("perturbation completed"))
    );
}

#[rstest]
fn missing_seed_is_reported() {
    let layer = RecordingLayer::default();
    {
        let _guard = layer.install();
        run(PerturbatorBuilder::new().with_remove_edges(1), chain_graph());
    }
    assert!(
        layer
            .events_at(Level::WARN)
            .iter()
            .any(|event| event.field("message").is_some_and(|msg| msg.contains("no seed")))
    );
}
