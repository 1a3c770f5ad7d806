//! Error types for the Canvass validation core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used throughout the core and application crates.
pub type Result<T> = std::result::Result<T, CanvassError>;

/// Which throttling scope rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleScope {
    /// The per-respondent session limit.
    Session,
    /// The origin-wide secondary limit.
    Origin,
}

impl std::fmt::Display for ThrottleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThrottleScope::Session => write!(f, "session"),
            ThrottleScope::Origin => write!(f, "origin"),
        }
    }
}

/// A shared error type for the survey validation core.
///
/// This provides typed, structured error variants with constructor helpers
/// so call sites stay terse. Throttling and transport failures are always
/// scoped to the single session/question they occurred for; they carry the
/// metadata a caller needs to recover (retry-after, failure message).
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CanvassError {
    /// Request rejected by the throttling gate. Recoverable: the caller may
    /// retry once `retry_after_secs` have elapsed.
    #[error("Throttled ({scope} limit): retry after {retry_after_secs}s")]
    Throttled {
        scope: ThrottleScope,
        retry_after_secs: u64,
    },

    /// An outbound completion call failed (network, auth, quota, timeout).
    #[error("Validation transport error: {message}")]
    Transport { message: String },

    /// Malformed question or prompt configuration, rejected at the config
    /// boundary before a run is created.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CanvassError {
    /// Creates a Throttled error.
    pub fn throttled(scope: ThrottleScope, retry_after_secs: u64) -> Self {
        Self::Throttled {
            scope,
            retry_after_secs,
        }
    }

    /// Creates a Transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a NotFound error.
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a Throttled error.
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }

    /// Check if this is a Transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this is a Config error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Retry-after metadata, present only on Throttled errors.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Throttled {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_carries_retry_after() {
        let err = CanvassError::throttled(ThrottleScope::Session, 42);
        assert!(err.is_throttled());
        assert_eq!(err.retry_after_secs(), Some(42));
        assert_eq!(
            err.to_string(),
            "Throttled (session limit): retry after 42s"
        );
    }

    #[test]
    fn transport_has_no_retry_after() {
        let err = CanvassError::transport("connection reset");
        assert!(err.is_transport());
        assert_eq!(err.retry_after_secs(), None);
    }
}
