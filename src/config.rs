use serde::Deserialize;
use std::{env, fs, path::PathBuf};
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Default OAuth client used against the identity service.
pub const DEFAULT_CLIENT_ID: &str = "cf";

/// Default HTTP timeout for transport and identity calls.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Options forwarded to the transport and identity collaborators.
///
/// The session core never interprets these; it only hands them to
/// [`crate::BaseClient`] and [`crate::UaaClient`] at construction time.
/// Build one with [`ClientConfig::from_json`] or [`ClientConfig::from_file`]
/// so `${VAR}` references are expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Log request and response bodies at debug level
    pub trace: bool,
    /// Append one JSON line per request to this file
    pub log_file: Option<PathBuf>,
    /// Identity service endpoint; derived from the target when absent
    pub uaa_url: Option<Url>,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_seconds: u64,
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            trace: false,
            log_file: None,
            uaa_url: None,
            client_id: default_client_id(),
            client_secret: String::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

/// On-disk shape of the config file. String fields are expanded before use.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    trace: bool,
    #[serde(default)]
    log_file: Option<String>,
    #[serde(default)]
    uaa_url: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl ClientConfig {
    /// Load the configuration file if one exists, otherwise return defaults.
    pub fn load() -> ClientResult<Self> {
        match resolve_config_path() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a configuration file, expanding `${VAR}` references in string fields.
    pub fn from_file(path: &std::path::Path) -> ClientResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> ClientResult<Self> {
        let cfg: RawConfig =
            serde_json::from_str(raw).map_err(|e| ClientError::Config(e.to_string()))?;

        let uaa_url = cfg
            .uaa_url
            .map(|u| Url::parse(&expand_env_vars(&u)))
            .transpose()?;

        Ok(Self {
            trace: cfg.trace,
            log_file: cfg.log_file.map(|p| PathBuf::from(expand_env_vars(&p))),
            uaa_url,
            client_id: cfg
                .client_id
                .map(|c| expand_env_vars(&c))
                .unwrap_or_else(default_client_id),
            client_secret: cfg
                .client_secret
                .map(|s| expand_env_vars(&s))
                .unwrap_or_default(),
            timeout_seconds: cfg.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        })
    }
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("CF_SESSION_CONFIG") {
        return Some(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("cf-session").join("config.json");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = PathBuf::from("cf-session.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}
