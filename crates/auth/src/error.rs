//! Authentication error types.

use thiserror::Error;

/// Failures from credential hashing and token validation.
///
/// Token failures are deliberately coarse: the HTTP boundary collapses all of
/// them into a single `401`, so the variants exist for logging and tests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token is not a well-formed JWT, or its claims are unusable.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Signature mismatch, or the token uses an algorithm other than HS256.
    #[error("bad token signature")]
    BadSignature,

    /// The `exp` instant has passed.
    #[error("token expired")]
    Expired,

    /// Password hashing failed (entropy or resource exhaustion).
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Token signing failed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::BadSignature,
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Malformed(err.to_string()),
        }
    }
}
