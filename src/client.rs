//! The session: authentication state plus the current organization and space.
//!
//! `Client` owns the token (stored in its transport and mirrored into the
//! identity client) and the two context hints used to scope queries. It is
//! a plain owned value; callers sharing one across tasks must wrap it in
//! their own lock.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{
    AuthToken, Credentials, IdentityService, UaaClient, UserOptions, default_uaa_url,
};
use crate::base::{BaseClient, Transport};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::model::{
    Organization, ServiceInstance, Space, User, materialize_service_instance, resources,
};
use crate::query::QueryOptions;
use crate::scope::{EntityKind, ScopeTarget, resolve_scope};
use crate::types::Guid;

/// Stateful session against one control-plane target.
pub struct Client {
    base: Box<dyn Transport>,
    uaa: Box<dyn IdentityService>,
    current_organization: Option<Organization>,
    current_space: Option<Space>,
}

impl Client {
    /// Create a session for `target`. Passing a token skips the login step.
    pub fn new(target: Url, token: Option<AuthToken>, config: ClientConfig) -> ClientResult<Self> {
        let uaa_url = config
            .uaa_url
            .clone()
            .unwrap_or_else(|| default_uaa_url(&target));

        let mut uaa = UaaClient::new(uaa_url, &config)?;
        uaa.set_token(token.clone());
        let base = BaseClient::new(target, token, &config)?;

        Ok(Self::with_collaborators(Box::new(base), Box::new(uaa)))
    }

    /// Create a session over explicit transport and identity collaborators.
    pub fn with_collaborators(base: Box<dyn Transport>, uaa: Box<dyn IdentityService>) -> Self {
        Self {
            base,
            uaa,
            current_organization: None,
            current_space: None,
        }
    }

    pub fn version(&self) -> u32 {
        2
    }

    pub fn target(&self) -> &Url {
        self.base.target()
    }

    pub fn set_target(&mut self, target: Url) {
        self.base.set_target(target);
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.base.token()
    }

    /// Install or clear the token directly.
    pub fn set_token(&mut self, token: Option<AuthToken>) {
        self.uaa.set_token(token.clone());
        self.base.set_token(token);
    }

    pub fn trace(&self) -> bool {
        self.base.trace()
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.base.set_trace(trace);
    }

    pub fn log(&self) -> Option<&Path> {
        self.base.log()
    }

    pub fn set_log(&mut self, log: Option<PathBuf>) {
        self.base.set_log(log);
    }

    pub async fn info(&self) -> ClientResult<Value> {
        self.base.info().await
    }

    pub fn current_organization(&self) -> Option<&Organization> {
        self.current_organization.as_ref()
    }

    pub fn set_current_organization(&mut self, organization: Option<Organization>) {
        self.current_organization = organization;
    }

    pub fn current_space(&self) -> Option<&Space> {
        self.current_space.as_ref()
    }

    pub fn set_current_space(&mut self, space: Option<Space>) {
        self.current_space = space;
    }

    /// Scope a query for `kind` runs against, given the current context.
    pub fn query_target(&self, kind: EntityKind) -> ScopeTarget<'_> {
        resolve_scope(
            kind,
            self.current_organization.as_ref(),
            self.current_space.as_ref(),
        )
    }

    /// Exchange credentials for a token.
    ///
    /// The current organization and space are cleared before the exchange,
    /// so they stay cleared when it fails. A failed exchange also drops the
    /// token, leaving the session anonymous.
    pub async fn login(&mut self, credentials: &Credentials) -> ClientResult<()> {
        self.current_organization = None;
        self.current_space = None;

        info!(
            user = credentials.username().unwrap_or("<passcode>"),
            "Logging in to {}",
            self.target()
        );

        let result = self.uaa.authorize(credentials).await;
        match result {
            Ok(token) => {
                self.set_token(Some(token));
                Ok(())
            }
            Err(e) => {
                warn!("Login failed: {}", e);
                self.set_token(None);
                Err(ClientError::Authentication(e))
            }
        }
    }

    /// Forget the token. No request is made.
    pub fn logout(&mut self) {
        debug!("Logging out of {}", self.target());
        self.set_token(None);
    }

    pub fn logged_in(&self) -> bool {
        self.base.token().is_some()
    }

    /// The user the current token identifies.
    ///
    /// `None` when anonymous or when the token carries no user id. The
    /// token's email claim replaces whatever the directory returned.
    pub async fn current_user(&self) -> ClientResult<Option<User>> {
        let Some(token) = self.token() else {
            return Ok(None);
        };

        let claims = token.claims();
        let Some(user_id) = claims.user_id else {
            debug!("Token carries no user id");
            return Ok(None);
        };

        let mut user = self.user(&Guid::new(user_id)).await?;
        user.set_email(claims.email);
        Ok(Some(user))
    }

    /// Create an identity, then the matching control-plane user.
    ///
    /// The identity is not removed if the second step fails.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        options: &UserOptions,
    ) -> ClientResult<User> {
        let identity = self.uaa.add_user(email, password, options).await?;

        let draft = User::new(identity.id.clone().into());
        let payload = match self.base.post("/v2/users", &draft.create_body()).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    identity = %identity.id,
                    "User create failed after identity was created: {}", e
                );
                return Err(e);
            }
        };

        let mut user = User::from_payload(payload)?;
        if user.emails.is_empty() {
            user.set_email(Some(email.to_string()));
        }
        info!("Registered user {} ({})", user.guid, email);
        Ok(user)
    }

    pub async fn login_prompts(&self) -> ClientResult<BTreeMap<String, Value>> {
        self.uaa.prompts().await
    }

    pub async fn user(&self, guid: &Guid) -> ClientResult<User> {
        User::from_payload(self.fetch(EntityKind::User, guid).await?)
    }

    pub async fn organization(&self, guid: &Guid) -> ClientResult<Organization> {
        Organization::from_payload(&self.fetch(EntityKind::Organization, guid).await?)
    }

    pub async fn space(&self, guid: &Guid) -> ClientResult<Space> {
        Space::from_payload(&self.fetch(EntityKind::Space, guid).await?)
    }

    pub async fn service_instance(&self, guid: &Guid) -> ClientResult<ServiceInstance> {
        let payload = self.fetch(EntityKind::ServiceInstance, guid).await?;
        self.make_service_instance(payload)
    }

    pub async fn organizations(&self, options: QueryOptions) -> ClientResult<Vec<Organization>> {
        self.list(EntityKind::Organization, options)
            .await?
            .iter()
            .map(Organization::from_payload)
            .collect()
    }

    /// Spaces, narrowed to the current organization when one is set.
    pub async fn spaces(&self, options: QueryOptions) -> ClientResult<Vec<Space>> {
        self.list(EntityKind::Space, options)
            .await?
            .iter()
            .map(Space::from_payload)
            .collect()
    }

    /// Raw resources of `kind`, scoped through [`Client::query_target`].
    pub async fn list(&self, kind: EntityKind, options: QueryOptions) -> ClientResult<Vec<Value>> {
        let path = self.query_target(kind).list_path(kind);
        self.list_from(&path, options).await
    }

    /// Raw resources under `path`, following `next_url` links.
    ///
    /// A `next_url` that points at a page already fetched is
    /// [`ClientError::InvalidPayload`].
    pub async fn list_from(&self, path: &str, options: QueryOptions) -> ClientResult<Vec<Value>> {
        let mut all = Vec::new();
        let mut visited = HashSet::new();
        let mut path = path.to_string();
        let mut options = options;

        loop {
            let page = self.base.get(&path, &options).await?;
            all.extend(resources(&page)?.iter().cloned());
            visited.insert(path.clone());

            match page.get("next_url").and_then(Value::as_str) {
                Some(next) => {
                    if visited.contains(next) {
                        return Err(ClientError::InvalidPayload(format!(
                            "next_url {} loops back to a fetched page",
                            next
                        )));
                    }
                    debug!("Following {}", next);
                    path = next.to_string();
                    // next_url already carries the query
                    options = QueryOptions::new();
                }
                None => break,
            }
        }

        Ok(all)
    }

    /// Service instances visible from the current context.
    ///
    /// Always requests user-provided instances too; a caller-supplied
    /// `user_provided` option is overwritten.
    pub async fn service_instances(
        &self,
        mut options: QueryOptions,
    ) -> ClientResult<Vec<ServiceInstance>> {
        options.set("user_provided", true);
        let path = self
            .query_target(EntityKind::ServiceInstance)
            .list_path(EntityKind::ServiceInstance);
        self.materialize_all(self.list_from(&path, options).await?)
    }

    /// Service instances under an explicit collection path.
    ///
    /// Same `user_provided` override as [`Client::service_instances`].
    pub async fn service_instances_from(
        &self,
        path: &str,
        mut options: QueryOptions,
    ) -> ClientResult<Vec<ServiceInstance>> {
        options.set("user_provided", true);
        self.materialize_all(self.list_from(path, options).await?)
    }

    /// Build the concrete service instance a payload describes, bound to this session.
    pub fn make_service_instance(&self, payload: Value) -> ClientResult<ServiceInstance> {
        materialize_service_instance(payload, self.target())
    }

    fn materialize_all(&self, payloads: Vec<Value>) -> ClientResult<Vec<ServiceInstance>> {
        payloads
            .into_iter()
            .map(|payload| self.make_service_instance(payload))
            .collect()
    }

    async fn fetch(&self, kind: EntityKind, guid: &Guid) -> ClientResult<Value> {
        let path = kind.entity_path(guid.as_str());
        self.base.get(&path, &QueryOptions::new()).await
    }
}
