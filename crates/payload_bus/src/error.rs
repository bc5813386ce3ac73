use crate::types::{CorrelationToken, Entity};
use thiserror::Error;

/// Errors raised by the payload bus.
///
/// None of these ever cross into the host tick as a panic; the bus logs them
/// and the caller falls back to default behavior.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Enqueue rejected because the producer key is missing.
    #[error("Invalid producer: {0}")]
    InvalidProducer(Entity),
    /// The reserved token value was used.
    #[error("Invalid correlation token")]
    InvalidToken,
    /// A second body was bound to a token that already carries one.
    #[error("Token already bound: {0}")]
    TokenAlreadyBound(CorrelationToken),
    /// A placeholder was found whose token has no binding.
    #[error("Unresolved {token} on placeholder {placeholder}")]
    UnresolvedToken {
        token: CorrelationToken,
        placeholder: Entity,
    },
    /// A placeholder was reclaimed without ever being matched.
    #[error("Orphan placeholder {placeholder} ({token})")]
    OrphanPlaceholder {
        token: CorrelationToken,
        placeholder: Entity,
    },
    /// The host could not materialize a placeholder.
    #[error("Placeholder unavailable: {0}")]
    PlaceholderUnavailable(String),
    /// Text window keys must be non-empty.
    #[error("Cache key cannot be empty")]
    EmptyCacheKey,
}
