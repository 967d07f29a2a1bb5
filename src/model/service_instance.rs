//! Service instances and their materialization from raw payloads.
//!
//! A service-instance payload carries `entity.type`. The tag is camelized and
//! matched against a closed table of variants; anything else is rejected.

use serde_json::Value;
use url::Url;

use super::{entity_str, envelope_guid};
use crate::error::{ClientError, ClientResult};
use crate::types::Guid;

const VARIANT_SUFFIX: &str = "ServiceInstance";

/// A service instance provisioned through a broker.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedServiceInstance {
    pub guid: Guid,
    /// Target of the session that fetched this instance
    pub target: Url,
    pub payload: Value,
}

impl ManagedServiceInstance {
    pub fn service_plan_guid(&self) -> Option<Guid> {
        entity_str(&self.payload, "service_plan_guid").map(Guid::new)
    }

    pub fn dashboard_url(&self) -> Option<&str> {
        entity_str(&self.payload, "dashboard_url")
    }
}

/// A service instance whose credentials were supplied by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProvidedServiceInstance {
    pub guid: Guid,
    /// Target of the session that fetched this instance
    pub target: Url,
    pub payload: Value,
}

impl UserProvidedServiceInstance {
    pub fn credentials(&self) -> Option<&Value> {
        self.payload.pointer("/entity/credentials")
    }

    pub fn syslog_drain_url(&self) -> Option<&str> {
        entity_str(&self.payload, "syslog_drain_url")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceInstance {
    Managed(ManagedServiceInstance),
    UserProvided(UserProvidedServiceInstance),
}

type Constructor = fn(Guid, Url, Value) -> ServiceInstance;

fn managed(guid: Guid, target: Url, payload: Value) -> ServiceInstance {
    ServiceInstance::Managed(ManagedServiceInstance {
        guid,
        target,
        payload,
    })
}

fn user_provided(guid: Guid, target: Url, payload: Value) -> ServiceInstance {
    ServiceInstance::UserProvided(UserProvidedServiceInstance {
        guid,
        target,
        payload,
    })
}

/// Every known variant, keyed by its type name.
const VARIANTS: [(&str, Constructor); 2] = [
    ("ManagedServiceInstance", managed),
    ("UserProvidedServiceInstance", user_provided),
];

impl ServiceInstance {
    pub fn guid(&self) -> &Guid {
        match self {
            Self::Managed(si) => &si.guid,
            Self::UserProvided(si) => &si.guid,
        }
    }

    pub fn target(&self) -> &Url {
        match self {
            Self::Managed(si) => &si.target,
            Self::UserProvided(si) => &si.target,
        }
    }

    pub fn payload(&self) -> &Value {
        match self {
            Self::Managed(si) => &si.payload,
            Self::UserProvided(si) => &si.payload,
        }
    }

    pub fn name(&self) -> Option<&str> {
        entity_str(self.payload(), "name")
    }

    pub fn space_guid(&self) -> Option<Guid> {
        entity_str(self.payload(), "space_guid").map(Guid::new)
    }

    /// Type name of the variant, as produced from the payload tag.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Managed(_) => VARIANTS[0].0,
            Self::UserProvided(_) => VARIANTS[1].0,
        }
    }

    pub fn is_user_provided(&self) -> bool {
        matches!(self, Self::UserProvided(_))
    }
}

/// `user_provided_service_instance` -> `UserProvidedServiceInstance`.
///
/// Only underscores separate words. Dashes and spaces stay in the name, so
/// such tags never match a variant.
pub fn camelize(tag: &str) -> String {
    tag.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn lookup(type_name: &str) -> Option<Constructor> {
    VARIANTS
        .iter()
        .find(|(name, _)| {
            *name == type_name
                || name
                    .strip_suffix(VARIANT_SUFFIX)
                    .is_some_and(|short| short == type_name)
        })
        .map(|(_, constructor)| *constructor)
}

/// Build the concrete service instance a payload describes.
///
/// Both the short tags (`managed`, `user_provided`) and the full wire tags
/// (`managed_service_instance`, ...) resolve. A missing or unmapped tag is
/// [`ClientError::UnknownVariant`].
pub fn materialize_service_instance(payload: Value, target: &Url) -> ClientResult<ServiceInstance> {
    let tag = entity_str(&payload, "type").unwrap_or_default().to_string();

    let constructor = lookup(&camelize(&tag)).ok_or(ClientError::UnknownVariant { tag })?;
    let guid = envelope_guid(&payload)?;

    Ok(constructor(guid, target.clone(), payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> Url {
        Url::parse("https://api.example.com").unwrap()
    }

    fn payload(tag: &str) -> Value {
        json!({
            "metadata": { "guid": "si-1" },
            "entity": {
                "type": tag,
                "name": "db",
                "space_guid": "space-1",
                "credentials": { "uri": "postgres://x" },
                "service_plan_guid": "plan-1"
            }
        })
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("user_provided"), "UserProvided");
        assert_eq!(
            camelize("managed_service_instance"),
            "ManagedServiceInstance"
        );
        assert_eq!(camelize(""), "");
    }

    #[test]
    fn test_user_provided_tag() {
        let si = materialize_service_instance(payload("user_provided"), &target()).unwrap();
        assert!(si.is_user_provided());
        assert_eq!(si.variant_name(), "UserProvidedServiceInstance");
        assert_eq!(si.guid().as_str(), "si-1");
        assert_eq!(si.name(), Some("db"));
        assert_eq!(si.target(), &target());

        let ServiceInstance::UserProvided(upsi) = si else {
            panic!("expected user provided variant");
        };
        assert_eq!(upsi.credentials().unwrap()["uri"], "postgres://x");
    }

    #[test]
    fn test_managed_tag() {
        let si = materialize_service_instance(payload("managed"), &target()).unwrap();
        let ServiceInstance::Managed(managed) = si else {
            panic!("expected managed variant");
        };
        assert_eq!(managed.service_plan_guid(), Some(Guid::new("plan-1")));
    }

    #[test]
    fn test_full_wire_tags() {
        let si = materialize_service_instance(
            payload("user_provided_service_instance"),
            &target(),
        )
        .unwrap();
        assert!(si.is_user_provided());

        let si =
            materialize_service_instance(payload("managed_service_instance"), &target()).unwrap();
        assert!(!si.is_user_provided());
        assert_eq!(si.space_guid(), Some(Guid::new("space-1")));
    }

    #[test]
    fn test_unknown_tag_is_error() {
        let err = materialize_service_instance(payload("mystery"), &target()).unwrap_err();
        match err {
            ClientError::UnknownVariant { tag } => assert_eq!(tag, "mystery"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tags_with_other_separators_are_rejected() {
        assert_eq!(camelize("user-provided"), "User-provided");

        for tag in ["user-provided", "user provided", "managed service instance"] {
            let err = materialize_service_instance(payload(tag), &target()).unwrap_err();
            match err {
                ClientError::UnknownVariant { tag: found } => assert_eq!(found, tag),
                other => panic!("unexpected error for {tag}: {other}"),
            }
        }
    }

    #[test]
    fn test_suffix_alone_is_not_a_variant() {
        let err = materialize_service_instance(payload("service_instance"), &target()).unwrap_err();
        assert!(matches!(err, ClientError::UnknownVariant { .. }));
    }

    #[test]
    fn test_missing_tag_is_error() {
        let payload = json!({ "metadata": { "guid": "x" }, "entity": {} });
        let err = materialize_service_instance(payload, &target()).unwrap_err();
        assert!(matches!(err, ClientError::UnknownVariant { tag } if tag.is_empty()));
    }

    #[test]
    fn test_missing_guid_is_invalid_payload() {
        let payload = json!({ "entity": { "type": "managed" } });
        let err = materialize_service_instance(payload, &target()).unwrap_err();
        assert!(matches!(err, ClientError::InvalidPayload(_)));
    }
}
