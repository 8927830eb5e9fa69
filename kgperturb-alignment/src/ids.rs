//! Integer identifiers for alignment files.

use kgperturb_core::{EntityId, KnowledgeGraph};

use crate::errors::AlignmentError;

/// Maps entity identifiers of both graphs onto one integer space.
///
/// `e<n>` identifiers become `n - 1`. Synthetic `rand_<k>` identifiers are
/// placed above every numbered entity of either graph, at `offset + k - 1`
/// where `offset` is the largest numbered ordinal present.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IdSpace {
    offset: u64,
}

impl IdSpace {
    /// Derives the synthetic offset from both graphs.
    #[must_use]
    pub fn for_graphs(original: &KnowledgeGraph, perturbed: &KnowledgeGraph) -> Self {
        let offset = original
            .entities()
            .chain(perturbed.entities())
            .map(|entity| entity.id())
            .filter(|id| !id.is_synthetic())
            .map(EntityId::ordinal)
            .max()
            .unwrap_or(0);
        Self { offset }
    }

    /// Returns the synthetic offset.
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.offset
    }

    /// Returns the integer identifier of `id`.
    ///
    /// # Errors
    /// Returns [`AlignmentError::IdentifierOverflow`] when a synthetic
    /// identifier lands beyond `u64::MAX`.
    ///
    /// # Examples
    /// ```
    /// use kgperturb_alignment::IdSpace;
    /// use kgperturb_core::{Attributes, Entity, EntityId, KnowledgeGraph};
    ///
    /// let graph = |ids: &[EntityId]| {
    ///     KnowledgeGraph::from_parts(ids.iter().map(|id| Entity::new(*id, Attributes::new())), [])
    /// };
    /// let original = graph(&[EntityId::Original(1), EntityId::Original(2)])?;
    /// let perturbed = graph(&[EntityId::Synthetic(1), EntityId::Reassigned(3)])?;
    /// let space = IdSpace::for_graphs(&original, &perturbed);
    /// assert_eq!(space.numeric(EntityId::Original(1))?, 0);
    /// assert_eq!(space.numeric(EntityId::Reassigned(3))?, 2);
    /// assert_eq!(space.numeric(EntityId::Synthetic(1))?, 3);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn numeric(self, id: EntityId) -> Result<u64, AlignmentError> {
        match id {
            EntityId::Original(ordinal) | EntityId::Reassigned(ordinal) => {
                Ok(ordinal.saturating_sub(1))
            }
            EntityId::Synthetic(ordinal) => self
                .offset
                .checked_add(ordinal)
                .map(|value| value - 1)
                .ok_or(AlignmentError::IdentifierOverflow { id }),
        }
    }
}
