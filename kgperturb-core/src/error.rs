//! Error types for the perturbation engine.
//!
//! Defines the graph-level and orchestration-level error enums, their stable
//! machine-readable codes, and a convenient result alias.

use std::fmt;

use thiserror::Error;

use crate::{
    hooks::RewriteOperation,
    id::{EntityId, IdParseError, Namespace},
    invariants::InvariantViolation,
    reassign::MappingError,
};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? $( ( $($tuple:tt)* ) )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? $( ( $($tuple)* ) )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced by [`crate::KnowledgeGraph`] edits and the mutation
/// operators built on them.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GraphError {
    /// An entity with the same identifier already exists.
    #[error("entity `{id}` already exists")]
    DuplicateEntity {
        /// Identifier that was inserted twice.
        id: EntityId,
    },
    /// The referenced entity is not part of the graph.
    #[error("entity `{id}` does not exist")]
    UnknownEntity {
        /// Identifier that could not be resolved.
        id: EntityId,
    },
    /// A relation referenced an endpoint that is not part of the graph.
    #[error("relation `{source_id}` -> `{target_id}` references missing entity `{missing}`")]
    DanglingRelation {
        /// Source endpoint of the rejected relation.
        source_id: EntityId,
        /// Target endpoint of the rejected relation.
        target_id: EntityId,
        /// The endpoint that failed to resolve.
        missing: EntityId,
    },
    /// The referenced relation slot is empty or out of range.
    #[error("relation #{index} does not exist")]
    UnknownRelation {
        /// Slot index of the missing relation.
        index: usize,
    },
    /// Sampling a relation requires two distinct entities.
    #[error("adding relations requires at least two entities but the graph holds {available}")]
    TooFewEntities {
        /// Number of entities available for sampling.
        available: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`GraphError`] variants.
    enum GraphErrorCode for GraphError {
        /// An entity with the same identifier already exists.
        DuplicateEntity => DuplicateEntity { .. } => "GRAPH_DUPLICATE_ENTITY",
        /// The referenced entity is not part of the graph.
        UnknownEntity => UnknownEntity { .. } => "GRAPH_UNKNOWN_ENTITY",
        /// A relation referenced an endpoint that is not part of the graph.
        DanglingRelation => DanglingRelation { .. } => "GRAPH_DANGLING_RELATION",
        /// The referenced relation slot is empty or out of range.
        UnknownRelation => UnknownRelation { .. } => "GRAPH_UNKNOWN_RELATION",
        /// Sampling a relation requires two distinct entities.
        TooFewEntities => TooFewEntities { .. } => "GRAPH_TOO_FEW_ENTITIES",
    }
}

/// Error type produced when configuring or running a [`crate::Perturbator`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PerturbError {
    /// The description pass was enabled but its policy writes nothing.
    #[error("description synthesis is enabled but neither the description nor the name is updated")]
    InertDescriptionPolicy,
    /// An identifier in the input graph is outside the original namespace.
    #[error("input entity `{id}` belongs to the {namespace} namespace, expected original")]
    UnexpectedNamespace {
        /// The offending identifier.
        id: EntityId,
        /// Namespace the identifier belongs to.
        namespace: Namespace,
    },
    /// A content pass was requested without a text rewriter.
    #[error("content pass `{operation}` requires a text rewriter but none was supplied")]
    RewriterUnavailable {
        /// First pass that needed a rewriter.
        operation: RewriteOperation,
    },
    /// `add_edges` was requested on a graph that cannot supply two endpoints.
    #[error(
        "{requested} relation(s) requested but only {projected} entit(y/ies) remain after entity mutation"
    )]
    InsufficientEntitiesForEdges {
        /// Number of synthetic relations requested.
        requested: usize,
        /// Entity count after the entity operators run.
        projected: usize,
    },
    /// The reassigned namespace would overflow the identifier range.
    #[error("reassigned namespace starting after {base} cannot hold {survivors} survivors")]
    NamespaceExhausted {
        /// Upper bound of the original namespace.
        base: u64,
        /// Number of identifiers that needed assigning.
        survivors: usize,
    },
    /// An add operator would grow the graph past what it can address.
    #[error("adding {requested} synthetic {items} to {existing} would exceed the limit of {limit}")]
    CapacityExceeded {
        /// `entities` or `relations`.
        items: &'static str,
        /// Number of synthetic items requested.
        requested: usize,
        /// Items present in the input graph.
        existing: usize,
        /// Largest item count a graph can hold.
        limit: usize,
    },
    /// A graph edit failed while running the pipeline.
    #[error("graph edit failed: {0}")]
    Graph(#[from] GraphError),
    /// The entity mapping could not be built.
    #[error("entity mapping is inconsistent: {0}")]
    Mapping(#[from] MappingError),
    /// A structural invariant did not hold after reassignment.
    #[error("structural invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
    /// An identifier failed to parse.
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] IdParseError),
}

define_error_codes! {
    /// Stable codes describing [`PerturbError`] variants.
    enum PerturbErrorCode for PerturbError {
        /// The description pass was enabled but its policy writes nothing.
        InertDescriptionPolicy => InertDescriptionPolicy => "PERTURB_INERT_DESCRIPTION_POLICY",
        /// An identifier in the input graph is outside the original namespace.
        UnexpectedNamespace => UnexpectedNamespace { .. } => "PERTURB_UNEXPECTED_NAMESPACE",
        /// A content pass was requested without a text rewriter.
        RewriterUnavailable => RewriterUnavailable { .. } => "PERTURB_REWRITER_UNAVAILABLE",
        /// `add_edges` was requested on a graph that cannot supply two endpoints.
        InsufficientEntitiesForEdges => InsufficientEntitiesForEdges { .. } => "PERTURB_INSUFFICIENT_ENTITIES_FOR_EDGES",
        /// The reassigned namespace would overflow the identifier range.
        NamespaceExhausted => NamespaceExhausted { .. } => "PERTURB_NAMESPACE_EXHAUSTED",
        /// An add operator would grow the graph past what it can address.
        CapacityExceeded => CapacityExceeded { .. } => "PERTURB_CAPACITY_EXCEEDED",
        /// A graph edit failed while running the pipeline.
        GraphFailure => Graph(..) => "PERTURB_GRAPH_FAILURE",
        /// The entity mapping could not be built.
        MappingFailure => Mapping(..) => "PERTURB_MAPPING_FAILURE",
        /// A structural invariant did not hold after reassignment.
        InvariantViolation => Invariant(..) => "PERTURB_INVARIANT_VIOLATION",
        /// An identifier failed to parse.
        MalformedIdentifier => MalformedIdentifier(..) => "PERTURB_MALFORMED_IDENTIFIER",
    }
}

impl PerturbError {
    /// Retrieve the inner [`GraphErrorCode`] when the error originated in a
    /// graph edit.
    #[must_use]
    pub const fn graph_code(&self) -> Option<GraphErrorCode> {
        match self {
            Self::Graph(error) => Some(error.code()),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the orchestration API.
pub type Result<T> = core::result::Result<T, PerturbError>;
