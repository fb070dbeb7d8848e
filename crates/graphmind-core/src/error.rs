//! Error taxonomy shared by every GraphMind crate.
//!
//! The variants correspond 1:1 to the error kinds in the reasoning core's
//! error-handling design: input errors never retry, store errors degrade
//! the current step, adapter errors retry before degrading, timeouts and
//! cancellation short-circuit outstanding work, and internal errors mark
//! an invariant breach without aborting the session.

use thiserror::Error;

/// Result type alias used throughout GraphMind.
pub type Result<T> = std::result::Result<T, GraphMindError>;

/// Errors that can occur anywhere in the reasoning core.
#[derive(Debug, Error)]
pub enum GraphMindError {
    /// Malformed caller input: empty question, unknown template, malformed plan.
    #[error("input error: {0}")]
    Input(String),

    /// Graph store lookup or query failed. Recoverable per-call.
    #[error("store error: {0}")]
    Store(String),

    /// LLM or embedding adapter failed transiently (rate limit, network blip).
    #[error("adapter error ({kind}): {message}")]
    Adapter {
        kind: AdapterErrorKind,
        message: String,
    },

    /// A task or session exceeded its wall-clock budget.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// The session or task was cancelled cooperatively.
    #[error("cancelled")]
    Cancelled,

    /// An invariant was violated (e.g. a step with a dangling endpoint).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Sub-classification of [`GraphMindError::Adapter`], mirroring spec.md §7's
/// "transient / rate_limited / permanent" taxonomy for LLM and embedding calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    /// Likely to succeed on retry (network blip, connection reset).
    Transient,
    /// Retry with backoff; provider is throttling.
    RateLimited,
    /// Will not succeed on retry (bad credentials, malformed request).
    Permanent,
}

impl AdapterErrorKind {
    /// Whether this error class is worth retrying at all.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::RateLimited)
    }
}

impl std::fmt::Display for AdapterErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Transient => "transient",
            Self::RateLimited => "rate_limited",
            Self::Permanent => "permanent",
        };
        f.write_str(label)
    }
}

impl GraphMindError {
    /// Build an adapter error with the transient classification.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Adapter {
            kind: AdapterErrorKind::Transient,
            message: message.into(),
        }
    }

    /// Build an adapter error with the rate-limited classification.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::Adapter {
            kind: AdapterErrorKind::RateLimited,
            message: message.into(),
        }
    }

    /// Build an adapter error with the permanent classification.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Adapter {
            kind: AdapterErrorKind::Permanent,
            message: message.into(),
        }
    }

    /// Whether this error should be retried under `max_retries`.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Adapter { kind, .. } if kind.is_retryable()
        )
    }
}

impl From<String> for GraphMindError {
    fn from(s: String) -> Self {
        Self::Internal(s)
    }
}

impl From<&str> for GraphMindError {
    fn from(s: &str) -> Self {
        Self::Internal(s.to_string())
    }
}
