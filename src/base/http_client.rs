//! reqwest implementation of [`Transport`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::{BoxFuture, Transport};
use crate::auth::AuthToken;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::query::QueryOptions;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "X-VCAP-Request-ID";

/// One line of the request log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    pub method: String,
    pub url: String,
    /// Absent when the request never got a response
    pub status: Option<u16>,
    pub duration_ms: u64,
}

/// HTTP client bound to a control-plane target.
pub struct BaseClient {
    target: Url,
    token: Option<AuthToken>,
    trace: bool,
    log: Option<PathBuf>,
    client: reqwest::Client,
}

impl BaseClient {
    pub fn new(target: Url, token: Option<AuthToken>, config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            target,
            token,
            trace: config.trace,
            log: config.log_file.clone(),
            client,
        })
    }

    /// Resolve `path` under the target, keeping any path prefix the target has.
    fn url_for(&self, path: &str) -> ClientResult<Url> {
        let mut base = self.target.clone();
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        params: Vec<(String, String)>,
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        let url = self.url_for(path)?;
        let request_id = Uuid::new_v4();

        let mut builder = self
            .client
            .request(method.clone(), url.clone())
            .header(http::header::ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if !params.is_empty() {
            builder = builder.query(&params);
        }
        if let Some(token) = &self.token {
            builder = builder.header(http::header::AUTHORIZATION, token.auth_header());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        if self.trace {
            let payload = body.map(Value::to_string).unwrap_or_default();
            debug!(%request_id, "REQUEST: {} {} {:?} {}", method, url, params, payload);
        }

        let started = Instant::now();
        let result = builder.send().await;
        let status = result.as_ref().ok().map(|r| r.status().as_u16());

        self.record(&RequestLogEntry {
            timestamp: Utc::now(),
            request_id,
            method: method.to_string(),
            url: url.to_string(),
            status,
            duration_ms: started.elapsed().as_millis() as u64,
        })
        .await;

        let response = result?;
        let status = response.status();
        let text = response.text().await?;

        if self.trace {
            debug!(%request_id, "RESPONSE: {} {}", status, text);
        }

        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn record(&self, entry: &RequestLogEntry) {
        let Some(path) = &self.log else {
            return;
        };

        let mut line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize request log entry: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = append_line(path, &line).await {
            warn!("Failed to write request log {}: {}", path.display(), e);
        }
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    // tokio completes file writes in the background until flushed
    file.flush().await
}

impl Transport for BaseClient {
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
        Box::pin(self.request(Method::GET, "/v2/info", Vec::new(), None))
    }

    fn get<'a>(
        &'a self,
        path: &'a str,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, ClientResult<Value>> {
        Box::pin(self.request(Method::GET, path, options.to_params(), None))
    }

    fn post<'a>(&'a self, path: &'a str, body: &'a Value) -> BoxFuture<'a, ClientResult<Value>> {
        Box::pin(self.request(Method::POST, path, Vec::new(), Some(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> BaseClient {
        BaseClient::new(
            Url::parse("https://api.example.com").unwrap(),
            None,
            &ClientConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_url_for_keeps_query() {
        let base = client();
        let url = base.url_for("/v2/apps?page=2").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v2/apps?page=2");
    }

    #[test]
    fn test_url_for_keeps_target_path_prefix() {
        for target in ["https://host.example.com/cf", "https://host.example.com/cf/"] {
            let base = BaseClient::new(
                Url::parse(target).unwrap(),
                None,
                &ClientConfig::default(),
            )
            .unwrap();
            let url = base.url_for("/v2/info").unwrap();
            assert_eq!(url.as_str(), "https://host.example.com/cf/v2/info");
        }
    }

    #[test]
    fn test_accessors_round_trip() {
        let mut base = client();
        assert!(!base.trace());
        assert!(base.log().is_none());

        base.set_trace(true);
        base.set_log(Some(PathBuf::from("/tmp/requests.log")));
        base.set_token(Some(AuthToken::from_bearer("abc")));
        base.set_target(Url::parse("https://api.other.com").unwrap());

        assert!(base.trace());
        assert_eq!(base.log(), Some(Path::new("/tmp/requests.log")));
        assert_eq!(base.token().unwrap().access_token(), "abc");
        assert_eq!(base.target().host_str(), Some("api.other.com"));
    }

    #[tokio::test]
    async fn test_record_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");

        let mut base = client();
        base.set_log(Some(path.clone()));

        for status in [Some(200), None] {
            base.record(&RequestLogEntry {
                timestamp: Utc::now(),
                request_id: Uuid::new_v4(),
                method: "GET".to_string(),
                url: "https://api.example.com/v2/info".to_string(),
                status,
                duration_ms: 3,
            })
            .await;
        }

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let entries: Vec<RequestLogEntry> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, Some(200));
        assert_eq!(entries[1].status, None);
    }

    #[tokio::test]
    async fn test_unreachable_target_is_transport_error() {
        let base = BaseClient::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            None,
            &ClientConfig {
                timeout_seconds: 2,
                ..Default::default()
            },
        )
        .unwrap();

        let err = base.info().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
