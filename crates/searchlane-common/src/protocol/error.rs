use std::collections::HashMap;
use thiserror::Error;

/// Every failure a Searchlane call can surface to its caller.
///
/// The executor recovers from single-host transport failures on its own, so
/// callers only ever see one of these terminal kinds.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Invalid application id, API key or host list. Raised at construction.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The service rejected the request (4xx). Never retried across hosts.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Every candidate host failed with a transport error or a 5xx.
    #[error("All {} hosts failed: {}", .attempted_hosts.len(), .attempted_hosts.join(", "))]
    NetworkExhausted {
        attempted_hosts: Vec<String>,
        per_host_errors: HashMap<String, String>,
    },

    /// A wait loop observed its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

impl SearchError {
    /// Builds an [`SearchError::Api`] from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        SearchError::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns `true` if repeating the same call later might succeed.
    ///
    /// Only host exhaustion qualifies: API errors are request-shape problems
    /// and repeat identically, configuration errors never go away on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SearchError::NetworkExhausted { .. })
    }

    pub fn is_api_error(&self) -> bool {
        matches!(self, SearchError::Api { .. })
    }

    /// Returns the HTTP status code for API errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SearchError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Per-host diagnostics for [`SearchError::NetworkExhausted`].
    pub fn host_errors(&self) -> Option<&HashMap<String, String>> {
        match self {
            SearchError::NetworkExhausted {
                per_host_errors, ..
            } => Some(per_host_errors),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
