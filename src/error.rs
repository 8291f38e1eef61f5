//! Failure modes of a validation exchange.
//!
//! None of these reach the hosting request: [`crate::VerdictClient::classify`]
//! turns each one into a fail-open [`crate::Verdict`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    /// The exchange did not settle before the deadline.
    #[error("validation request timed out after {0} ms")]
    Timeout(u64),

    /// Network failure or a malformed HTTP exchange.
    #[error("validation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A non-200 response body that is not the expected JSON document.
    #[error("malformed verdict body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

/// Errors building a [`crate::VerdictClient`].
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid public suffix pattern: {0}")]
    PublicSuffix(#[from] regex::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ValidationError {
    /// Status recorded on the fail-open verdict for this error.
    pub fn fallback_status(&self) -> u16 {
        match self {
            ValidationError::Timeout(_) => 408,
            ValidationError::Transport(_) | ValidationError::MalformedBody(_) => 500,
        }
    }
}
