//! Entity identifier namespaces.
//!
//! Input graphs follow the `e<n>` convention. A perturbation run introduces two
//! further namespaces: synthetic entities minted by the add operator
//! (`rand_<n>`) and reassigned survivors, which reuse the `e` prefix but start
//! above every ordinal the original graph occupies. Modelling the namespaces
//! as a tagged union keeps the disjointness rules checkable without string
//! parsing once a graph has been loaded.

use std::fmt;

use thiserror::Error;

/// Prefix shared by original and reassigned entity identifiers.
pub const ENTITY_PREFIX: &str = "e";

/// Prefix used for entities minted by the add-entities operator.
pub const SYNTHETIC_PREFIX: &str = "rand_";

/// Namespace an [`EntityId`] belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Namespace {
    /// Identifiers present in the input graph.
    Original,
    /// Identifiers minted for synthetic, unaligned entities.
    Synthetic,
    /// Identifiers assigned to survivors after reassignment.
    Reassigned,
}

impl Namespace {
    /// Stable lowercase label used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Synthetic => "synthetic",
            Self::Reassigned => "reassigned",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of an entity within a [`crate::KnowledgeGraph`].
///
/// # Examples
/// ```
/// use kgperturb_core::{EntityId, Namespace};
///
/// let id = EntityId::parse_original("e12")?;
/// assert_eq!(id, EntityId::Original(12));
/// assert_eq!(id.namespace(), Namespace::Original);
/// assert_eq!(id.to_string(), "e12");
/// assert_eq!(EntityId::Synthetic(3).to_string(), "rand_3");
/// # Ok::<(), kgperturb_core::IdParseError>(())
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum EntityId {
    /// Identifier carried over from the input graph.
    Original(u64),
    /// Identifier of an entity introduced by the add-entities operator.
    Synthetic(u64),
    /// Identifier assigned to a survivor during reassignment.
    Reassigned(u64),
}

impl EntityId {
    /// Parses an identifier from the input graph (`e<n>`, `n >= 1`).
    ///
    /// # Errors
    /// Returns [`IdParseError`] when the prefix is missing, the suffix is not a
    /// canonical positive integer, or the ordinal is zero.
    pub fn parse_original(raw: &str) -> Result<Self, IdParseError> {
        parse_prefixed(raw, ENTITY_PREFIX).map(Self::Original)
    }

    /// Parses an identifier from a perturbed graph's reassigned namespace.
    ///
    /// # Errors
    /// Returns [`IdParseError`] under the same rules as
    /// [`Self::parse_original`].
    pub fn parse_reassigned(raw: &str) -> Result<Self, IdParseError> {
        parse_prefixed(raw, ENTITY_PREFIX).map(Self::Reassigned)
    }

    /// Parses an identifier from a perturbed graph, where `e<n>` denotes a
    /// reassigned survivor and `rand_<n>` a synthetic entity.
    ///
    /// # Errors
    /// Returns [`IdParseError`] when neither form matches.
    pub fn parse_perturbed(raw: &str) -> Result<Self, IdParseError> {
        if raw.starts_with(SYNTHETIC_PREFIX) {
            return parse_prefixed(raw, SYNTHETIC_PREFIX).map(Self::Synthetic);
        }
        Self::parse_reassigned(raw)
    }

    /// Returns the namespace of this identifier.
    #[must_use]
    pub const fn namespace(self) -> Namespace {
        match self {
            Self::Original(_) => Namespace::Original,
            Self::Synthetic(_) => Namespace::Synthetic,
            Self::Reassigned(_) => Namespace::Reassigned,
        }
    }

    /// Returns the numeric suffix of this identifier.
    #[must_use]
    pub const fn ordinal(self) -> u64 {
        match self {
            Self::Original(n) | Self::Synthetic(n) | Self::Reassigned(n) => n,
        }
    }

    /// Returns whether this identifier was minted by the add-entities operator.
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        matches!(self, Self::Synthetic(_))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original(n) | Self::Reassigned(n) => write!(f, "{ENTITY_PREFIX}{n}"),
            Self::Synthetic(n) => write!(f, "{SYNTHETIC_PREFIX}{n}"),
        }
    }
}

/// Error returned when an identifier does not follow the prefixed-ordinal
/// convention.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum IdParseError {
    /// The identifier does not start with the expected prefix.
    #[error("identifier `{raw}` does not start with `{prefix}`")]
    MissingPrefix {
        /// Identifier as it appeared in the input.
        raw: String,
        /// Prefix that was expected.
        prefix: &'static str,
    },
    /// The suffix is not a canonical decimal integer.
    #[error("identifier `{raw}` does not end in a canonical integer")]
    InvalidOrdinal {
        /// Identifier as it appeared in the input.
        raw: String,
    },
    /// Ordinals start at one.
    #[error("identifier `{raw}` uses ordinal zero")]
    ZeroOrdinal {
        /// Identifier as it appeared in the input.
        raw: String,
    },
}

fn parse_prefixed(raw: &str, prefix: &'static str) -> Result<u64, IdParseError> {
    let suffix = raw
        .strip_prefix(prefix)
        .ok_or_else(|| IdParseError::MissingPrefix {
            raw: raw.to_owned(),
            prefix,
        })?;
    // Leading zeros would not survive a render round trip.
    let canonical = !suffix.is_empty()
        && suffix.bytes().all(|byte| byte.is_ascii_digit())
        && (suffix == "0" || !suffix.starts_with('0'));
    if !canonical {
        return Err(IdParseError::InvalidOrdinal {
            raw: raw.to_owned(),
        });
    }
    let ordinal = suffix
        .parse::<u64>()
        .map_err(|_| IdParseError::InvalidOrdinal {
            raw: raw.to_owned(),
        })?;
    if ordinal == 0 {
        return Err(IdParseError::ZeroOrdinal {
            raw: raw.to_owned(),
        });
    }
    Ok(ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("e1", 1)]
    #[case("e42", 42)]
    #[case("e18446744073709551615", u64::MAX)]
    fn parse_original_accepts_canonical_ids(#[case] raw: &str, #[case] expected: u64) {
        let id = EntityId::parse_original(raw).expect("identifier must parse");
        assert_eq!(id, EntityId::Original(expected));
        assert_eq!(id.to_string(), raw);
    }

    #[rstest]
    #[case::synthetic("rand_3")]
    #[case::other_prefix("x7")]
    #[case::uppercase("E7")]
    #[case::empty("")]
    fn parse_original_rejects_foreign_prefixes(#[case] raw: &str) {
        let err = EntityId::parse_original(raw).expect_err("prefix must be rejected");
        assert!(matches!(err, IdParseError::MissingPrefix { .. }), "{err:?}");
    }

    #[rstest]
    #[case::bare_prefix("e")]
    #[case::sign("e+5")]
    #[case::negative("e-1")]
    #[case::leading_zero("e01")]
    #[case::trailing("e1x")]
    #[case::overflow("e18446744073709551616")]
    fn parse_original_rejects_malformed_suffixes(#[case] raw: &str) {
        let err = EntityId::parse_original(raw).expect_err("suffix must be rejected");
        assert!(matches!(err, IdParseError::InvalidOrdinal { .. }), "{err:?}");
    }

    #[rstest]
    fn parse_original_rejects_zero() {
        let err = EntityId::parse_original("e0").expect_err("zero must be rejected");
        assert!(matches!(err, IdParseError::ZeroOrdinal { .. }));
    }

    #[rstest]
    #[case("rand_2", EntityId::Synthetic(2))]
    #[case("e9", EntityId::Reassigned(9))]
    fn parse_perturbed_distinguishes_namespaces(#[case] raw: &str, #[case] expected: EntityId) {
        let id = EntityId::parse_perturbed(raw).expect("identifier must parse");
        assert_eq!(id, expected);
        assert_eq!(id.to_string(), raw);
    }

    #[rstest]
    fn namespaces_compare_unequal_for_same_ordinal() {
        assert_ne!(EntityId::Original(4), EntityId::Reassigned(4));
        assert_eq!(EntityId::Original(4).ordinal(), EntityId::Reassigned(4).ordinal());
        assert!(EntityId::Synthetic(1).is_synthetic());
        assert_eq!(EntityId::Reassigned(1).namespace().as_str(), "reassigned");
    }
}
