// Core modules
mod config;
mod error;
mod query;
mod types;

pub mod auth;
pub mod base;
pub mod model;
pub mod scope;

// Session
mod client;

// Re-export key types
pub use auth::{
    AuthError, AuthToken, Credentials, ExternalIdentity, IdentityService, TokenClaims, UaaClient,
    UserOptions,
};
pub use base::{BaseClient, Transport};
pub use client::Client;
pub use config::{ClientConfig, resolve_config_path};
pub use error::{ClientError, ClientResult};
pub use model::{Organization, ServiceInstance, Space, User, materialize_service_instance};
pub use query::{QueryOptions, USER_PROVIDED_PARAM};
pub use scope::{EntityKind, ScopeTarget, resolve_scope};
pub use types::{ExternalUserId, Guid};
