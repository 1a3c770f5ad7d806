//! Abstract completion capability.
//!
//! The validation core never talks to a concrete LLM provider. It depends
//! on a single capability ("given a system instruction and a user message,
//! return a text completion"), expressed as a trait so provider clients
//! and test doubles plug in from outside.

use crate::error::CanvassError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure of one outbound completion call.
///
/// There is no retry contract: a failed call is reported to the caller
/// as-is, scoped to the one question it was issued for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The call exceeded its bounded timeout.
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),
    /// Network, auth or quota failure reported by the provider client.
    #[error("completion transport failure: {0}")]
    Transport(String),
}

impl From<CompletionError> for CanvassError {
    fn from(err: CompletionError) -> Self {
        CanvassError::transport(err.to_string())
    }
}

/// The single abstract LLM capability the validation core depends on.
///
/// Implementations are expected to be cheap to share (`Arc<dyn
/// CompletionAgent>`) and safe to call concurrently; batch validation
/// fans out one call per question.
#[async_trait]
pub trait CompletionAgent: Send + Sync {
    /// Returns a text completion for the given system instruction and user
    /// message.
    async fn complete(
        &self,
        system_instruction: &str,
        user_message: &str,
    ) -> Result<String, CompletionError>;
}
