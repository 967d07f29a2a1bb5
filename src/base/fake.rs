//! In-memory collaborators for session tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use url::Url;

use super::{BoxFuture, Transport};
use crate::auth::{
    AuthError, AuthToken, Credentials, ExternalIdentity, IdentityService, UserOptions,
};
use crate::error::{ClientError, ClientResult};
use crate::query::QueryOptions;
use crate::types::ExternalUserId;

/// A network call observed by [`FakeTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

pub type CallLog = Arc<Mutex<Vec<RecordedCall>>>;

/// Transport answering from canned responses keyed by path.
pub struct FakeTransport {
    target: Url,
    token: Option<AuthToken>,
    trace: bool,
    log: Option<PathBuf>,
    responses: HashMap<String, Value>,
    failures: HashMap<String, u16>,
    calls: CallLog,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            target: Url::parse("https://api.example.com").unwrap(),
            token: None,
            trace: false,
            log: None,
            responses: HashMap::new(),
            failures: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_token(mut self, token: AuthToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_response(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), body);
        self
    }

    pub fn with_failure(mut self, path: &str, status: u16) -> Self {
        self.failures.insert(path.to_string(), status);
        self
    }

    /// Shared handle on the call log, usable after the fake is boxed.
    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }

    fn record(&self, call: RecordedCall) -> ClientResult<()> {
        let path = call.path.clone();
        self.calls.lock().unwrap().push(call);
        match self.failures.get(&path) {
            Some(status) => Err(ClientError::from_status(*status, "fake failure".to_string())),
            None => Ok(()),
        }
    }
}

impl Transport for FakeTransport {
    fn target(&self) -> &Url {
        &self.target
    }

    fn set_target(&mut self, target: Url) {
        self.target = target;
    }

    fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    fn set_token(&mut self, token: Option<AuthToken>) {
        self.token = token;
    }

    fn trace(&self) -> bool {
        self.trace
    }

    fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    fn log(&self) -> Option<&Path> {
        self.log.as_deref()
    }

    fn set_log(&mut self, log: Option<PathBuf>) {
        self.log = log;
    }

    fn info(&self) -> BoxFuture<'_, ClientResult<Value>> {
        Box::pin(self.get_owned("/v2/info".to_string(), Vec::new()))
    }

    fn get<'a>(
        &'a self,
        path: &'a str,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, ClientResult<Value>> {
        Box::pin(self.get_owned(path.to_string(), options.to_params()))
    }

    fn post<'a>(&'a self, path: &'a str, body: &'a Value) -> BoxFuture<'a, ClientResult<Value>> {
        Box::pin(self.post_owned(path.to_string(), body.clone()))
    }
}

impl FakeTransport {
    async fn get_owned(&self, path: String, params: Vec<(String, String)>) -> ClientResult<Value> {
        self.record(RecordedCall {
            method: "GET",
            path: path.clone(),
            params,
            body: None,
        })?;

        self.responses
            .get(&path)
            .cloned()
            .ok_or(ClientError::NotFound(path))
    }

    async fn post_owned(&self, path: String, body: Value) -> ClientResult<Value> {
        self.record(RecordedCall {
            method: "POST",
            path: path.clone(),
            params: Vec::new(),
            body: Some(body.clone()),
        })?;

        Ok(self.responses.get(&path).cloned().unwrap_or_else(|| {
            json!({
                "metadata": { "guid": body.get("guid").cloned().unwrap_or(Value::Null) },
                "entity": body,
            })
        }))
    }
}

/// Identity service that grants one fixed token, or rejects every login.
pub struct FakeIdentity {
    grant: Option<AuthToken>,
    identity_id: String,
    added_users: Arc<Mutex<Vec<String>>>,
    mirrored_token: Arc<Mutex<Option<AuthToken>>>,
}

impl FakeIdentity {
    pub fn granting(token: AuthToken) -> Self {
        Self {
            grant: Some(token),
            ..Self::rejecting()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            grant: None,
            identity_id: "uaa-user-1".to_string(),
            added_users: Arc::new(Mutex::new(Vec::new())),
            mirrored_token: Arc::new(Mutex::new(None)),
        }
    }

    pub fn added_users(&self) -> Arc<Mutex<Vec<String>>> {
        self.added_users.clone()
    }

    pub fn mirrored_token(&self) -> Arc<Mutex<Option<AuthToken>>> {
        self.mirrored_token.clone()
    }
}

impl IdentityService for FakeIdentity {
    fn authorize<'a>(
        &'a self,
        _credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthToken, AuthError>> {
        let result = self
            .grant
            .clone()
            .ok_or_else(|| AuthError::InvalidCredentials("Bad credentials".to_string()));
        Box::pin(async move { result })
    }

    fn add_user<'a>(
        &'a self,
        email: &'a str,
        _password: &'a str,
        _options: &'a UserOptions,
    ) -> BoxFuture<'a, ClientResult<ExternalIdentity>> {
        self.added_users.lock().unwrap().push(email.to_string());
        let result: ClientResult<ExternalIdentity> = Ok(ExternalIdentity {
            id: ExternalUserId::new(self.identity_id.clone()),
        });
        Box::pin(async move { result })
    }

    fn prompts(&self) -> BoxFuture<'_, ClientResult<BTreeMap<String, Value>>> {
        let mut prompts = BTreeMap::new();
        prompts.insert("username".to_string(), json!(["text", "Email"]));
        prompts.insert("password".to_string(), json!(["password", "Password"]));
        let result: ClientResult<BTreeMap<String, Value>> = Ok(prompts);
        Box::pin(async move { result })
    }

    fn set_token(&mut self, token: Option<AuthToken>) {
        *self.mirrored_token.lock().unwrap() = token;
    }
}
