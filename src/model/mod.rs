//! Typed views over control-plane entity envelopes.
//!
//! Every v2 resource arrives as `{"metadata": {"guid": ..}, "entity": {..}}`.

pub mod service_instance;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::types::Guid;

pub use service_instance::{
    ManagedServiceInstance, ServiceInstance, UserProvidedServiceInstance,
    materialize_service_instance,
};

/// Guid from the envelope's metadata section.
pub fn envelope_guid(payload: &Value) -> ClientResult<Guid> {
    payload
        .pointer("/metadata/guid")
        .and_then(Value::as_str)
        .map(Guid::new)
        .ok_or_else(|| ClientError::InvalidPayload("missing metadata.guid".to_string()))
}

/// String field from the envelope's entity section.
pub fn entity_str<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    payload.get("entity")?.get(field)?.as_str()
}

/// Resources of a list response.
pub fn resources(page: &Value) -> ClientResult<&[Value]> {
    page.get("resources")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| ClientError::InvalidPayload("missing resources".to_string()))
}

/// An organization, usable as the session's current organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub guid: Guid,
    pub name: String,
}

impl Organization {
    pub fn new(guid: Guid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
        }
    }

    pub fn from_payload(payload: &Value) -> ClientResult<Self> {
        let guid = envelope_guid(payload)?;
        let name = entity_str(payload, "name").unwrap_or_default();
        Ok(Self::new(guid, name))
    }
}

/// A space, usable as the session's current space.
///
/// The owning organization is informational only; nothing checks it against
/// the session's current organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub guid: Guid,
    pub name: String,
    #[serde(default)]
    pub organization_guid: Option<Guid>,
}

impl Space {
    pub fn new(guid: Guid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
            organization_guid: None,
        }
    }

    pub fn with_organization(mut self, organization_guid: Guid) -> Self {
        self.organization_guid = Some(organization_guid);
        self
    }

    pub fn from_payload(payload: &Value) -> ClientResult<Self> {
        let guid = envelope_guid(payload)?;
        let name = entity_str(payload, "name").unwrap_or_default();
        let organization_guid = entity_str(payload, "organization_guid").map(Guid::new);
        Ok(Self {
            guid,
            name: name.to_string(),
            organization_guid,
        })
    }
}

/// A control-plane user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub guid: Guid,
    /// Primary email first
    pub emails: Vec<String>,
    pub admin: bool,
    pub payload: Value,
}

impl User {
    pub fn new(guid: Guid) -> Self {
        Self {
            guid,
            emails: Vec::new(),
            admin: false,
            payload: Value::Null,
        }
    }

    pub fn from_payload(payload: Value) -> ClientResult<Self> {
        let guid = envelope_guid(&payload)?;
        let admin = payload
            .pointer("/entity/admin")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let emails = entity_str(&payload, "email")
            .map(|e| vec![e.to_string()])
            .unwrap_or_default();
        Ok(Self {
            guid,
            emails,
            admin,
            payload,
        })
    }

    pub fn email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }

    /// Replace the user's emails with a single authoritative address.
    pub fn set_email(&mut self, email: Option<String>) {
        self.emails = email.into_iter().collect();
    }

    /// Body for creating this user in the control plane.
    pub fn create_body(&self) -> Value {
        serde_json::json!({ "guid": self.guid })
    }
}
