//! Error types for Guacamole API operations.
//!
//! Errors are categorized so callers can decide how to report them. The
//! reconciler never aborts on a backend error; the category only changes
//! the message the user sees.

use std::fmt;

/// Result type alias for Guacamole operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of backend errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection refused, timeout, 5xx.
    Network,
    /// Object does not exist.
    NotFound,
    /// Token missing, expired or lacking the needed permission.
    Permission,
    /// Request rejected as invalid (duplicate name, bad parameters).
    Rejected,
    /// Response could not be decoded.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Object not found",
            Self::Permission => "Permission denied",
            Self::Rejected => "Request rejected by server",
            Self::Format => "Invalid response format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check that the Guacamole server is reachable and run again",
            Self::NotFound => "The object was removed concurrently; run again to converge",
            Self::Permission => "Check the API token and the account's system permissions",
            Self::Rejected => "Check names and parameters in the template",
            Self::Format => "Check that the URL points at a Guacamole API",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur talking to a Guacamole backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Object does not exist on the backend.
    #[error("{kind} not found: {identifier}")]
    NotFound {
        /// Object kind (connection, group, user, ...).
        kind: &'static str,
        /// Identifier or username that was looked up.
        identifier: String,
    },

    /// Object already exists.
    #[error("{kind} already exists: {name}")]
    AlreadyExists {
        /// Object kind.
        kind: &'static str,
        /// Name of the existing object.
        name: String,
    },

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: &'static str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            identifier: identifier.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http { status, .. } => match status {
                Some(404) => ErrorCategory::NotFound,
                Some(401 | 403) => ErrorCategory::Permission,
                Some(400 | 409) => ErrorCategory::Rejected,
                _ => ErrorCategory::Network,
            },
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::AlreadyExists { .. } => ErrorCategory::Rejected,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.category().is_transient()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {}", code),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
