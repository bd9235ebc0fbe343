//! Error taxonomy shared across the crate.
//!
//! Every failure is categorised so callers can decide between retrying,
//! falling back and aborting:
//! - configuration errors are fatal and raised before any repository is touched
//! - network/timeout errors and 429/5xx API responses are retryable
//! - authentication errors are surfaced immediately, never retried
//! - git errors are handled by the push orchestration (bounded pull-and-retry)
//!
//! The [`ContribError::is_retryable`] predicate is what the retry policy
//! consults between attempts.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContribError>;

#[derive(Debug, Error)]
pub enum ContribError {
    /// Invalid or missing configuration. Fatal: raised before processing starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The remote rejected our credential. Never retried.
    #[error("authentication rejected during {operation}: {detail}")]
    Auth { operation: String, detail: String },

    /// Non-2xx response from an HTTP API.
    #[error("{operation} returned HTTP {status}: {detail}")]
    Api {
        operation: String,
        status: u16,
        detail: String,
    },

    /// Transport-level failure reaching an HTTP endpoint.
    #[error("network failure during {operation}: {source}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// A bounded operation exceeded its deadline.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// A git subprocess exited non-zero.
    #[error("git {operation} failed for {repo}: {detail}")]
    Git {
        repo: String,
        operation: String,
        detail: String,
    },

    /// A content strategy could not produce usable output.
    #[error("content generation failed: {0}")]
    Generate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContribError {
    /// Whether a retry policy may attempt the operation again.
    ///
    /// 429 and 5xx responses count as transient; auth failures and everything
    /// configuration- or git-shaped do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ContribError::Network { .. } | ContribError::Timeout { .. } => true,
            ContribError::Api { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }

    /// Classify a reqwest transport error, separating timeouts from other
    /// network failures.
    pub fn from_reqwest(operation: &str, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ContribError::Timeout {
                operation: operation.to_string(),
                seconds: timeout_secs,
            }
        } else {
            ContribError::Network {
                operation: operation.to_string(),
                source: err,
            }
        }
    }
}
