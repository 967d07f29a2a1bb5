//! Identity service (UAA) boundary.
//!
//! The session only needs three things from the identity service: exchange
//! credentials for a token, create a user identity, and list login prompts.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::auth::credentials::Credentials;
use crate::auth::error::AuthError;
use crate::auth::token::{AuthToken, TokenInfo};
use crate::base::BoxFuture;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::types::ExternalUserId;

/// Identity record created by [`IdentityService::add_user`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub id: ExternalUserId,
}

/// Optional profile fields for a new identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOptions {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

/// Operations the session requires from the identity service.
pub trait IdentityService: Send + Sync {
    /// Exchange credentials for a bearer token.
    fn authorize<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthToken, AuthError>>;

    /// Create a user identity in the directory.
    fn add_user<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
        options: &'a UserOptions,
    ) -> BoxFuture<'a, ClientResult<ExternalIdentity>>;

    /// Login prompts advertised by the identity service (e.g. username, password).
    fn prompts(&self) -> BoxFuture<'_, ClientResult<BTreeMap<String, Value>>>;

    /// Keep the identity client's credential in step with the session.
    fn set_token(&mut self, token: Option<AuthToken>);
}

/// Derive the identity service endpoint from a control-plane target,
/// e.g. `https://api.example.com` becomes `https://uaa.example.com`.
pub fn default_uaa_url(target: &Url) -> Url {
    let mut url = target.clone();
    if let Some(host) = target.host_str()
        && let Some(rest) = host.strip_prefix("api.")
    {
        let _ = url.set_host(Some(&format!("uaa.{}", rest)));
    }
    url
}

/// reqwest-backed identity service client.
pub struct UaaClient {
    url: Url,
    client_id: String,
    client_secret: String,
    token: Option<AuthToken>,
    client: reqwest::Client,
}

impl UaaClient {
    pub fn new(url: Url, config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: None,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.url.join(path)?)
    }

    async fn request_token(&self, credentials: &Credentials) -> Result<AuthToken, AuthError> {
        let url = self
            .endpoint("/oauth/token")
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        debug!("Requesting token from {}", url);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(http::header::ACCEPT, "application/json")
            .form(&credentials.to_form())
            .send()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::BAD_REQUEST {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let reason = body
                .get("error_description")
                .and_then(|d| d.as_str())
                .unwrap_or("Bad credentials")
                .to_string();
            return Err(AuthError::InvalidCredentials(reason));
        }

        if !status.is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "HTTP {} from token endpoint",
                status
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(AuthToken::from_token_info(info))
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        options: &UserOptions,
    ) -> ClientResult<ExternalIdentity> {
        let body = json!({
            "userName": email,
            "emails": [{ "value": email }],
            "password": password,
            "name": {
                "givenName": options.given_name.as_deref().unwrap_or(email),
                "familyName": options.family_name.as_deref().unwrap_or(email),
            }
        });

        let mut request = self
            .client
            .post(self.endpoint("/Users")?)
            .header(http::header::ACCEPT, "application/json")
            .json(&body);
        if let Some(token) = &self.token {
            request = request.header(http::header::AUTHORIZATION, token.auth_header());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }

        let identity: ExternalIdentity = response.json().await?;
        info!("Created identity {} for {}", identity.id, email);
        Ok(identity)
    }

    async fn fetch_prompts(&self) -> ClientResult<BTreeMap<String, Value>> {
        let response = self
            .client
            .get(self.endpoint("/login")?)
            .header(http::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }

        let body: Value = response.json().await?;
        let prompts = match body.get("prompts") {
            Some(Value::Object(map)) => map.clone().into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Ok(prompts)
    }
}

impl IdentityService for UaaClient {
    fn authorize<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthToken, AuthError>> {
        Box::pin(self.request_token(credentials))
    }

    fn add_user<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
        options: &'a UserOptions,
    ) -> BoxFuture<'a, ClientResult<ExternalIdentity>> {
        Box::pin(self.create_user(email, password, options))
    }

    fn prompts(&self) -> BoxFuture<'_, ClientResult<BTreeMap<String, Value>>> {
        Box::pin(self.fetch_prompts())
    }

    fn set_token(&mut self, token: Option<AuthToken>) {
        self.token = token;
    }
}
