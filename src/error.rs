//! Error taxonomy for the ingestion pipeline.
//!
//! Authentication and parse failures are rejected before any collaborator
//! call; orchestration failures are caught in the gateway handler and
//! converted into a best-effort fallback notice. Nothing here retries —
//! redelivery is entirely the platform's responsibility.

use thiserror::Error;

/// Why an inbound request failed authentication.
///
/// Always produced before the body is parsed; never triggers side effects.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("signing secret, signature, or timestamp missing")]
    MissingCredentials,
    #[error("request timestamp outside the freshness window")]
    StaleTimestamp,
    #[error("request signature mismatch")]
    SignatureMismatch,
}

/// Why the acknowledge → generate → relay sequence failed.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("messaging call failed: {0:#}")]
    Messaging(anyhow::Error),
    #[error("completion call failed: {0:#}")]
    Completion(anyhow::Error),
    #[error("collaborator call timed out")]
    Timeout,
}

impl OrchestrationError {
    /// Classify a messaging collaborator failure, folding request timeouts
    /// into [`OrchestrationError::Timeout`].
    pub fn messaging(err: anyhow::Error) -> Self {
        if is_timeout(&err) {
            Self::Timeout
        } else {
            Self::Messaging(err)
        }
    }

    /// Classify a completion collaborator failure, folding request timeouts
    /// into [`OrchestrationError::Timeout`].
    pub fn completion(err: anyhow::Error) -> Self {
        if is_timeout(&err) {
            Self::Timeout
        } else {
            Self::Completion(err)
        }
    }
}

fn is_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(reqwest::Error::is_timeout)
    })
}
