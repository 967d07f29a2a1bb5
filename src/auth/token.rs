//! Bearer token held by the session, and the claims embedded in it.

use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::decode_header;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token response returned by the identity service.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Identity attributes embedded in the access token.
///
/// Every field is optional: a token without embedded identity is still a
/// valid credential, it just does not resolve to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    /// Expiry as seconds since the epoch
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Opaque bearer credential owned by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// Full `Authorization` header value, e.g. `bearer eyJ...`
    auth_header: String,
}

impl AuthToken {
    pub fn new(auth_header: impl Into<String>) -> Self {
        Self {
            auth_header: auth_header.into(),
        }
    }

    /// Wrap a raw access token as a bearer credential.
    ///
    /// Accepts either the bare token or a full `bearer <token>` header value.
    pub fn from_bearer(token: &str) -> Self {
        let token = token.trim();
        if strip_scheme(token).is_some() {
            Self::new(token)
        } else {
            Self::new(format!("bearer {}", token))
        }
    }

    pub fn from_token_info(info: TokenInfo) -> Self {
        Self::new(format!("{} {}", info.token_type, info.access_token))
    }

    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    /// The access token without its scheme prefix.
    pub fn access_token(&self) -> &str {
        strip_scheme(&self.auth_header).unwrap_or(&self.auth_header)
    }

    /// Decode the claims embedded in the access token.
    ///
    /// No signature check and no network call. A token that is not a
    /// decodable JWT yields empty claims.
    pub fn claims(&self) -> TokenClaims {
        let token = self.access_token();

        if let Err(e) = decode_header(token) {
            debug!("Access token is not a JWT: {}", e);
            return TokenClaims::default();
        }

        let Some(payload) = token.split('.').nth(1) else {
            return TokenClaims::default();
        };

        let bytes = match base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
        {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Failed to decode token payload: {}", e);
                return TokenClaims::default();
            }
        };

        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            debug!("Failed to parse token claims: {}", e);
            TokenClaims::default()
        })
    }
}

fn strip_scheme(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| rest.trim())
}

#[cfg(test)]
pub(crate) fn jwt_with_claims(claims: serde_json::Value) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = engine.encode(claims.to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}
