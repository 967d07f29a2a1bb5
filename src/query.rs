//! Options shaped by the session before a list or fetch reaches the transport.

use std::collections::BTreeMap;

use serde_json::Value;

/// Wire name of the flag that makes the control plane include user-provided
/// service instances in a service-instance listing.
pub const USER_PROVIDED_PARAM: &str = "return_user_provided_service_instances";

/// Query options for a list or fetch call.
///
/// Keys are option names as callers know them (`user_provided`, `depth`,
/// `q`...). [`QueryOptions::to_params`] maps them to wire query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    options: BTreeMap<String, Value>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace an option.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.options.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Filter on a field, e.g. `name:my-app`.
    pub fn filter(self, field: &str, value: &str) -> Self {
        self.with("q", format!("{}:{}", field, value))
    }

    /// Render the options as wire query parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        self.options
            .iter()
            .map(|(key, value)| {
                let name = match key.as_str() {
                    "user_provided" => USER_PROVIDED_PARAM,
                    "depth" => "inline-relations-depth",
                    other => other,
                };
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.to_string(), rendered)
            })
            .collect()
    }
}
