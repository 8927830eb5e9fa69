//! In-memory rows of every alignment file.

use std::collections::{BTreeMap, BTreeSet};

use kgperturb_core::{EntityMapping, KnowledgeGraph};
use tracing::{debug, instrument};

use crate::{
    errors::AlignmentError,
    ids::IdSpace,
    labels::{display_name, strip_ontology_prefix, type_label},
    split::PairSplit,
};

/// Rows describing one side of the alignment.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GraphTables {
    /// `(entity id, display name)` in graph order.
    pub entity_names: Vec<(u64, String)>,
    /// `(entity id, type id)` in graph order; `-1` marks an unknown type.
    pub entity_types: Vec<(u64, i64)>,
    /// `(relation id, relation type)` sorted by type.
    pub relation_ids: Vec<(usize, String)>,
    /// `(head id, relation id, tail id)` in graph order.
    pub triples: Vec<(u64, usize, u64)>,
}

/// Every table written by [`crate::write_alignment_files`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AlignmentTables {
    /// `(type id, type)` over the sorted union of both graphs' types.
    pub type_ids: Vec<(usize, String)>,
    /// Tables of the original graph.
    pub original: GraphTables,
    /// Tables of the perturbed graph.
    pub perturbed: GraphTables,
    /// Aligned pairs, shuffled and split.
    pub pairs: PairSplit,
}

fn relation_type_ids(graph: &KnowledgeGraph, first_id: usize) -> BTreeMap<String, usize> {
    graph
        .relations()
        .map(|relation| strip_ontology_prefix(relation.relation_type()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(index, label)| (label, first_id + index))
        .collect()
}

fn graph_tables(
    graph: &KnowledgeGraph,
    ids: IdSpace,
    type_ids: &BTreeMap<String, usize>,
    first_relation_id: usize,
) -> Result<GraphTables, AlignmentError> {
    let mut tables = GraphTables::default();
    for entity in graph.entities() {
        let id = ids.numeric(entity.id())?;
        let type_id = type_ids
            .get(&type_label(entity))
            .and_then(|value| i64::try_from(*value).ok())
            .unwrap_or(-1);
        tables.entity_names.push((id, display_name(entity)));
        tables.entity_types.push((id, type_id));
    }

    let relation_ids = relation_type_ids(graph, first_relation_id);
    for relation in graph.relations() {
        let label = strip_ontology_prefix(relation.relation_type());
        if let Some(relation_id) = relation_ids.get(&label) {
            tables.triples.push((
                ids.numeric(relation.source())?,
                *relation_id,
                ids.numeric(relation.target())?,
            ));
        }
    }
    tables.relation_ids = relation_ids
        .into_iter()
        .map(|(label, relation_id)| (relation_id, label))
        .collect();
    Ok(tables)
}

fn aligned_pairs(
    original: &KnowledgeGraph,
    perturbed: &KnowledgeGraph,
    mapping: &EntityMapping,
    ids: IdSpace,
) -> Result<Vec<(u64, u64)>, AlignmentError> {
    mapping
        .iter()
        .map(|(key, value)| {
            if !original.contains_entity(key) {
                return Err(AlignmentError::UnknownMappingKey { id: key });
            }
            if !perturbed.contains_entity(value) {
                return Err(AlignmentError::UnknownMappingValue { id: value });
            }
            Ok((ids.numeric(key)?, ids.numeric(value)?))
        })
        .collect()
}

impl AlignmentTables {
    /// Builds every table from the two graphs and the survivor mapping.
    ///
    /// # Errors
    /// Returns [`AlignmentError::UnknownMappingKey`] or
    /// [`AlignmentError::UnknownMappingValue`] when the mapping references
    /// entities missing from the graphs, and
    /// [`AlignmentError::IdentifierOverflow`] when a synthetic identifier
    /// cannot be numbered.
    #[instrument(
        name = "align.build",
        err,
        skip(original, perturbed, mapping),
        fields(
            original_entities = original.entity_count(),
            perturbed_entities = perturbed.entity_count(),
            pairs = mapping.len(),
        ),
    )]
    pub fn build(
        original: &KnowledgeGraph,
        perturbed: &KnowledgeGraph,
        mapping: &EntityMapping,
    ) -> Result<Self, AlignmentError> {
        let ids = IdSpace::for_graphs(original, perturbed);
        let type_ids: BTreeMap<String, usize> = original
            .entities()
            .chain(perturbed.entities())
            .map(type_label)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(index, label)| (label, index))
            .collect();

        let original_tables = graph_tables(original, ids, &type_ids, 0)?;
        let perturbed_tables =
            graph_tables(perturbed, ids, &type_ids, original_tables.relation_ids.len())?;
        let pairs = PairSplit::new(aligned_pairs(original, perturbed, mapping, ids)?);
        debug!(
            offset = ids.offset(),
            types = type_ids.len(),
            test_pairs = pairs.test().len(),
            train_pairs = pairs.train().len(),
            "alignment tables built"
        );

        Ok(Self {
            type_ids: type_ids
                .into_iter()
                .map(|(label, type_id)| (type_id, label))
                .collect(),
            original: original_tables,
            perturbed: perturbed_tables,
            pairs,
        })
    }
}
