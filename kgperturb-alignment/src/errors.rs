use std::path::PathBuf;

use kgperturb_core::EntityId;
use thiserror::Error;

/// Errors raised while building or writing alignment files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AlignmentError {
    /// A mapping key does not name an entity of the original graph.
    #[error("mapping key {id} is not an entity of the original graph")]
    UnknownMappingKey { id: EntityId },
    /// A mapping value does not name an entity of the perturbed graph.
    #[error("mapping value {id} is not an entity of the perturbed graph")]
    UnknownMappingValue { id: EntityId },
    /// The integer identifier for an entity does not fit in 64 bits.
    #[error("integer identifier for {id} overflows")]
    IdentifierOverflow { id: EntityId },
    /// Writing an output file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
