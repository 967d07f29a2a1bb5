//! Errors raised by the identity service boundary.

use std::fmt;

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity service rejected the credentials
    InvalidCredentials(String),
    /// The identity service answered with something other than a token
    InvalidResponse(String),
    /// The identity service could not be reached
    Unreachable(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials(msg) => write!(f, "Invalid credentials: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid token response: {}", msg),
            Self::Unreachable(msg) => write!(f, "Identity service unreachable: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}
