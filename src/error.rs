//! Error taxonomy for session operations.
//!
//! Only `Authentication` and `UnknownVariant` originate in the session core.
//! The remaining variants are produced by the transport and identity
//! collaborators and reach the caller unchanged.

use std::fmt;

use crate::auth::AuthError;

/// Errors returned by [`crate::Client`] and its collaborators.
#[derive(Debug)]
pub enum ClientError {
    /// Credential exchange was rejected during login.
    Authentication(AuthError),

    /// A service-instance payload carried a type tag with no registered variant.
    UnknownVariant {
        /// The raw tag found under `entity.type`
        tag: String,
    },

    /// The requested resource does not exist.
    NotFound(String),

    /// The control plane rejected the request body.
    Validation(String),

    /// Any other non-success HTTP response.
    Http {
        /// HTTP status code
        status: u16,
        /// Response body, as returned
        body: String,
    },

    /// The request never produced a response.
    Transport(String),

    /// A response was missing fields every entity envelope must carry.
    InvalidPayload(String),

    /// Configuration could not be loaded or was invalid.
    Config(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication(err) => write!(f, "Authentication failed: {}", err),
            Self::UnknownVariant { tag } => {
                write!(f, "Unknown service instance type: {}", tag)
            }
            Self::NotFound(what) => write!(f, "Not found: {}", what),
            Self::Validation(msg) => write!(f, "Validation failed: {}", msg),
            Self::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
            Self::InvalidPayload(msg) => write!(f, "Invalid payload: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Authentication(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for session operations.
pub type ClientResult<T> = Result<T, ClientError>;

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        Self::Authentication(err)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {}", err))
    }
}

impl ClientError {
    /// Map a non-success HTTP response to the matching variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            404 => Self::NotFound(body),
            400 | 422 => Self::Validation(body),
            _ => Self::Http { status, body },
        }
    }
}
