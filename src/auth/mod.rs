//! Authentication state carried by the session.
//!
//! - **Token**: the bearer credential and its locally decodable claims
//! - **Credentials**: what `login` exchanges for a token
//! - **UAA**: the identity service boundary (token issue, user creation)
//!
//! The session owns exactly one token at a time; it is stored in the
//! transport and mirrored into the identity client.

mod credentials;
mod error;
mod token;
pub mod uaa;

pub use credentials::Credentials;
pub use error::AuthError;
pub use token::{AuthToken, TokenClaims, TokenInfo};
pub use uaa::{ExternalIdentity, IdentityService, UaaClient, UserOptions, default_uaa_url};

#[cfg(test)]
pub(crate) use token::jwt_with_claims;
