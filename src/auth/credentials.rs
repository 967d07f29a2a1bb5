//! Credentials exchanged with the identity service at login.

use serde::Deserialize;

/// What a caller presents to [`crate::Client::login`].
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    /// Resource-owner password grant
    Password { username: String, password: String },
    /// One-time passcode obtained from the identity service login page
    Passcode { passcode: String },
}

impl Credentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn passcode(passcode: impl Into<String>) -> Self {
        Self::Passcode {
            passcode: passcode.into(),
        }
    }

    /// Username for log lines, if any.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Password { username, .. } => Some(username),
            Self::Passcode { .. } => None,
        }
    }

    /// Form fields of the token request.
    pub fn to_form(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Password { username, password } => vec![
                ("grant_type", "password".to_string()),
                ("username", username.clone()),
                ("password", password.clone()),
            ],
            Self::Passcode { passcode } => vec![
                ("grant_type", "password".to_string()),
                ("passcode", passcode.clone()),
            ],
        }
    }
}

// Secrets stay out of Debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Passcode { .. } => f.debug_struct("Passcode").finish_non_exhaustive(),
        }
    }
}
