use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::UserId;

use crate::AuthError;

/// Lifetime of an issued token.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims model.
///
/// Lives only inside the signed token string; nothing here is persisted
/// server-side. Timestamps are Unix seconds as RFC 7519 requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: decimal user id.
    pub sub: String,

    /// Issued-at (Unix seconds).
    pub iat: i64,

    /// Expiry (Unix seconds).
    pub exp: i64,
}

impl TokenClaims {
    /// Claim set for `subject`, valid for [`TOKEN_TTL_HOURS`] from `now`.
    pub fn new(subject: UserId, now: DateTime<Utc>) -> Self {
        Self::with_ttl(subject, now, Duration::hours(TOKEN_TTL_HOURS))
    }

    pub fn with_ttl(subject: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn subject(&self) -> Result<UserId, AuthError> {
        self.sub
            .parse::<UserId>()
            .map_err(|e| AuthError::malformed(format!("sub: {e}")))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Deterministically validate claim timestamps against `now`.
///
/// A token is expired from its `exp` second onwards. Signature verification
/// happens before this in [`crate::token`].
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), AuthError> {
    if claims.exp <= claims.iat {
        return Err(AuthError::malformed("exp must be after iat"));
    }

    if now.timestamp() >= claims.exp {
        return Err(AuthError::Expired);
    }

    Ok(())
}
