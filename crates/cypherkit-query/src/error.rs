//! Error types for query construction.
//!
//! Rendering a well-formed fragment cannot fail, so the only errors in this
//! crate are raised while a fragment is being built.

use thiserror::Error;

/// Errors raised while constructing a query fragment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// Segment and value counts disagree (`segments != values + 1`)
    #[error("fragment arity mismatch: {segments} segments for {values} values")]
    ArityMismatch { segments: usize, values: usize },

    /// Template contains an unmatched `{` or `}`
    #[error("malformed template at byte {position}: {reason}")]
    MalformedTemplate { position: usize, reason: &'static str },

    /// Text spliced verbatim into a query is not a plain Cypher identifier
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}
