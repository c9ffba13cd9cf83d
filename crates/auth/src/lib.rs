//! `storefront-auth`: authentication and ownership boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it hashes
//! passwords, issues and validates signed tokens, and answers ownership
//! questions. Callers supply the records.

pub mod authorize;
pub mod claims;
pub mod error;
pub mod password;
pub mod token;
pub mod user;

pub use authorize::{OwnedAction, OwnedResource, authorize_owner, AuthzError};
pub use claims::{TokenClaims, TOKEN_TTL_HOURS, validate_claims};
pub use error::AuthError;
pub use password::CredentialStore;
pub use token::{Hs256TokenService, TokenIssuer, TokenValidator};
pub use user::{Credentials, NewUser, Registration, User, UserProfile};
