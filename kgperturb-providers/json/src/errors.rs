use kgperturb_core::{GraphError, IdParseError, MappingError};
use thiserror::Error;

/// Errors raised while decoding or encoding knowledge-graph JSON.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JsonGraphError {
    #[error("top-level JSON value must be an object")]
    NotAnObject,
    #[error("missing top-level key `{key}`")]
    MissingKey { key: &'static str },
    #[error("`{key}` must be an array")]
    NotAnArray { key: &'static str },
    #[error("{section}[{index}] must be an object")]
    RecordNotAnObject { section: &'static str, index: usize },
    #[error("{section}[{index}] is missing string field `{field}`")]
    MissingField {
        section: &'static str,
        index: usize,
        field: &'static str,
    },
    #[error("{section}[{index}].{field} must be a string")]
    FieldNotAString {
        section: &'static str,
        index: usize,
        field: &'static str,
    },
    #[error("{section}[{index}] has an invalid identifier: {source}")]
    InvalidIdentifier {
        section: &'static str,
        index: usize,
        #[source]
        source: IdParseError,
    },
    #[error("mapping value for `{key}` must be a string")]
    MappingValueNotAString { key: String },
    #[error("invalid mapping identifier: {0}")]
    MappingIdentifier(#[source] IdParseError),
    #[error("graph is inconsistent: {0}")]
    Graph(#[from] GraphError),
    #[error("mapping is inconsistent: {0}")]
    Mapping(#[from] MappingError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
