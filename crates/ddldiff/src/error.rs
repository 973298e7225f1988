//! Error types for catalog parsing, reconciliation and rendering.

use crate::diffable::Kind;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ddldiff operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The serialized catalog snapshot or action could not be decoded
    #[error("Failed to parse catalog payload: {0}")]
    Parse(#[from] serde_json::Error),

    /// A matched pair of entities disagree on their kind
    #[error("Cannot diff {found} against a prior {expected}")]
    KindMismatch { expected: Kind, found: Kind },

    /// Two siblings of the same kind share an identity within one snapshot
    #[error("Duplicate {kind} identity among siblings: {identity}")]
    DuplicateIdentity { kind: Kind, identity: String },

    /// The action has no PostgreSQL DDL equivalent
    #[error("{action} cannot be expressed as PostgreSQL DDL")]
    Unsupported { action: String },

    /// A target expression pattern did not compile
    #[error("Invalid target expression: {0}")]
    InvalidTargetExpression(#[from] regex::Error),
}
