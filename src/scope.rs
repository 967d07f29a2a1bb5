//! Context scoping for entity queries.
//!
//! Each entity kind declares whether it lives inside an organization or a
//! space. When the session has a matching current organization or space,
//! list queries for that kind are narrowed to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Organization, Space};

/// Static scoping capabilities of an entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scoping {
    pub organization: bool,
    pub space: bool,
}

impl Scoping {
    const NONE: Self = Self {
        organization: false,
        space: false,
    };
    const ORGANIZATION: Self = Self {
        organization: true,
        space: false,
    };
    const SPACE: Self = Self {
        organization: false,
        space: true,
    };
}

/// Entity kinds exposed by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organization,
    Space,
    Domain,
    App,
    Route,
    ServiceInstance,
    ServiceBinding,
    Service,
    ServicePlan,
    ServiceBroker,
    ServiceAuthToken,
    User,
    Stack,
    QuotaDefinition,
}

impl EntityKind {
    pub const ALL: [EntityKind; 14] = [
        Self::Organization,
        Self::Space,
        Self::Domain,
        Self::App,
        Self::Route,
        Self::ServiceInstance,
        Self::ServiceBinding,
        Self::Service,
        Self::ServicePlan,
        Self::ServiceBroker,
        Self::ServiceAuthToken,
        Self::User,
        Self::Stack,
        Self::QuotaDefinition,
    ];

    pub const fn scoping(self) -> Scoping {
        match self {
            Self::Space | Self::Domain => Scoping::ORGANIZATION,
            Self::App | Self::Route | Self::ServiceInstance => Scoping::SPACE,
            Self::Organization
            | Self::ServiceBinding
            | Self::Service
            | Self::ServicePlan
            | Self::ServiceBroker
            | Self::ServiceAuthToken
            | Self::User
            | Self::Stack
            | Self::QuotaDefinition => Scoping::NONE,
        }
    }

    pub const fn requires_organization_scope(self) -> bool {
        self.scoping().organization
    }

    pub const fn requires_space_scope(self) -> bool {
        self.scoping().space
    }

    /// Path segment of the collection, e.g. `service_instances`.
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Organization => "organizations",
            Self::Space => "spaces",
            Self::Domain => "domains",
            Self::App => "apps",
            Self::Route => "routes",
            Self::ServiceInstance => "service_instances",
            Self::ServiceBinding => "service_bindings",
            Self::Service => "services",
            Self::ServicePlan => "service_plans",
            Self::ServiceBroker => "service_brokers",
            Self::ServiceAuthToken => "service_auth_tokens",
            Self::User => "users",
            Self::Stack => "stacks",
            Self::QuotaDefinition => "quota_definitions",
        }
    }

    /// Path of a single entity of this kind.
    pub fn entity_path(self, guid: &str) -> String {
        format!("/v2/{}/{}", self.plural(), guid)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts the plural path segment or its singular form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| {
                let plural = kind.plural();
                normalized == plural || Some(normalized.as_str()) == plural.strip_suffix('s')
            })
            .ok_or_else(|| format!("unknown entity kind: {}", s))
    }
}

/// Where a query for some entity kind is executed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScopeTarget<'a> {
    Space(&'a Space),
    Organization(&'a Organization),
    /// Unscoped: the whole target.
    Session,
}

impl ScopeTarget<'_> {
    /// Collection path of `kind` under this scope.
    pub fn list_path(&self, kind: EntityKind) -> String {
        match self {
            Self::Space(space) => format!("/v2/spaces/{}/{}", space.guid, kind.plural()),
            Self::Organization(org) => {
                format!("/v2/organizations/{}/{}", org.guid, kind.plural())
            }
            Self::Session => format!("/v2/{}", kind.plural()),
        }
    }
}

/// Pick the narrowest scope the current context allows for `kind`.
///
/// Space wins over organization. A kind that requires a scope which is not
/// currently selected falls through to the broader scope; no error is raised.
pub fn resolve_scope<'a>(
    kind: EntityKind,
    current_organization: Option<&'a Organization>,
    current_space: Option<&'a Space>,
) -> ScopeTarget<'a> {
    if kind.requires_space_scope()
        && let Some(space) = current_space
    {
        return ScopeTarget::Space(space);
    }

    if kind.requires_organization_scope()
        && let Some(org) = current_organization
    {
        return ScopeTarget::Organization(org);
    }

    ScopeTarget::Session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Guid;

    fn org() -> Organization {
        Organization::new(Guid::new("org-1"), "acme")
    }

    fn space() -> Space {
        Space::new(Guid::new("space-1"), "dev")
    }

    #[test]
    fn test_resolve_scope_exhaustive() {
        let org = org();
        let space = space();
        let contexts = [
            (None, None),
            (Some(&org), None),
            (None, Some(&space)),
            (Some(&org), Some(&space)),
        ];

        for kind in EntityKind::ALL {
            for (current_org, current_space) in contexts {
                let target = resolve_scope(kind, current_org, current_space);
                let expected = if kind.requires_space_scope() && current_space.is_some() {
                    ScopeTarget::Space(&space)
                } else if kind.requires_organization_scope() && current_org.is_some() {
                    ScopeTarget::Organization(&org)
                } else {
                    ScopeTarget::Session
                };
                assert_eq!(target, expected, "kind {:?}", kind);
            }
        }
    }

    #[test]
    fn test_space_scoped_without_space_falls_back_to_session() {
        let org = org();
        // App is space scoped only; an org alone does not narrow it
        assert_eq!(
            resolve_scope(EntityKind::App, Some(&org), None),
            ScopeTarget::Session
        );
    }

    #[test]
    fn test_space_need_not_belong_to_org() {
        let org = org();
        let other = Space::new(Guid::new("space-9"), "elsewhere")
            .with_organization(Guid::new("org-2"));
        assert_eq!(
            resolve_scope(EntityKind::Route, Some(&org), Some(&other)),
            ScopeTarget::Space(&other)
        );
    }

    #[test]
    fn test_list_paths() {
        let org = org();
        let space = space();
        assert_eq!(
            ScopeTarget::Space(&space).list_path(EntityKind::App),
            "/v2/spaces/space-1/apps"
        );
        assert_eq!(
            ScopeTarget::Organization(&org).list_path(EntityKind::Domain),
            "/v2/organizations/org-1/domains"
        );
        assert_eq!(
            ScopeTarget::Session.list_path(EntityKind::ServiceInstance),
            "/v2/service_instances"
        );
    }

    #[test]
    fn test_entity_kind_from_str() {
        assert_eq!("apps".parse::<EntityKind>(), Ok(EntityKind::App));
        assert_eq!("app".parse::<EntityKind>(), Ok(EntityKind::App));
        assert_eq!(
            "service-instances".parse::<EntityKind>(),
            Ok(EntityKind::ServiceInstance)
        );
        assert!("widgets".parse::<EntityKind>().is_err());
    }
}
