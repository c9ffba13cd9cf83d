//! Stateless signed identity tokens (HS256 JWT).
//!
//! Lifecycle per token: issued, valid until `exp`, then expired. There is no
//! server-side revocation; a leaked token stays usable until it expires.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;

use storefront_core::UserId;

use crate::{AuthError, TokenClaims, validate_claims};

/// Issues tokens for an authenticated subject.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, subject: UserId, now: DateTime<Utc>) -> Result<String, AuthError>;
}

/// Validates tokens and resolves their subject. Must not perform IO.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError>;
}

/// HMAC-SHA256 token service keyed by the process-wide secret.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Clone)]
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl Hs256TokenService {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        // Expiry is checked by `validate_claims` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::hours(crate::TOKEN_TTL_HOURS),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl core::fmt::Debug for Hs256TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenService")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenIssuer for Hs256TokenService {
    fn issue(&self, subject: UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = TokenClaims::with_ttl(subject, now, self.ttl);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

impl TokenValidator for Hs256TokenService {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError> {
        if header_algorithm(token)? != "HS256" {
            return Err(AuthError::BadSignature);
        }

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)?;
        validate_claims(&data.claims, now)?;
        data.claims.subject()
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Read the `alg` header without trusting it.
///
/// Done by hand so that algorithms `jsonwebtoken` cannot even represent
/// (e.g. `none`) are reported as a signature failure, not a parse failure.
fn header_algorithm(token: &str) -> Result<String, AuthError> {
    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::malformed("expected three dot-separated segments"));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| AuthError::malformed(format!("header encoding: {e}")))?;
    let raw: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::malformed(format!("header json: {e}")))?;

    Ok(raw.alg)
}
