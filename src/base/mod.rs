//! Transport boundary between the session and the control-plane API.
//!
//! [`Transport`] is the seam the session is written against. [`BaseClient`]
//! is the reqwest implementation used outside of tests.

mod http_client;
#[cfg(test)]
pub(crate) mod fake;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde_json::Value;
use url::Url;

use crate::auth::AuthToken;
use crate::error::ClientResult;
use crate::query::QueryOptions;

pub use self::http_client::{BaseClient, REQUEST_ID_HEADER, RequestLogEntry};

/// Boxed future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Authenticated HTTP calls against a target, plus the state those calls use.
///
/// The accessors are forwarded verbatim by [`crate::Client`]; the session adds
/// no logic to them.
pub trait Transport: Send + Sync {
    fn target(&self) -> &Url;

    fn set_target(&mut self, target: Url);

    fn token(&self) -> Option<&AuthToken>;

    fn set_token(&mut self, token: Option<AuthToken>);

    /// Whether request and response bodies are traced.
    fn trace(&self) -> bool;

    fn set_trace(&mut self, trace: bool);

    /// File receiving one JSON line per request, if any.
    fn log(&self) -> Option<&Path>;

    fn set_log(&mut self, log: Option<PathBuf>);

    /// Target metadata (`/v2/info`).
    fn info(&self) -> BoxFuture<'_, ClientResult<Value>>;

    /// GET `path` relative to the target, with `options` as query parameters.
    fn get<'a>(
        &'a self,
        path: &'a str,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, ClientResult<Value>>;

    /// POST a JSON body to `path` relative to the target.
    fn post<'a>(&'a self, path: &'a str, body: &'a Value) -> BoxFuture<'a, ClientResult<Value>>;
}
