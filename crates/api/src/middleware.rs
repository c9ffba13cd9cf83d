use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::Instrument;

use storefront_auth::TokenValidator;

use crate::app::errors::ApiError;
use crate::context::{PrincipalContext, RequestId};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const HEADER_REQUIRED: &str = "authorization header required";
const BAD_FORMAT: &str = "invalid authorization format, use: Bearer <token>";
const BAD_TOKEN: &str = "invalid or expired token";

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenValidator>,
}

/// Validate the bearer token and attach the caller to the request.
///
/// Stateless: every request revalidates signature and expiry.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let user_id = state.tokens.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "token rejected");
        ApiError::unauthorized(BAD_TOKEN)
    })?;

    req.extensions_mut().insert(PrincipalContext::new(user_id));

    Ok(next.run(req).await)
}

/// Exactly `Bearer <token>`: one space, two parts.
fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized(HEADER_REQUIRED))?;

    let header = header
        .to_str()
        .map_err(|_| ApiError::unauthorized(BAD_FORMAT))?;
    if header.is_empty() {
        return Err(ApiError::unauthorized(HEADER_REQUIRED));
    }

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(ApiError::unauthorized(BAD_FORMAT)),
    }
}

/// Wrap each request in a span carrying a request id, and echo the id back.
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(RequestId::new)
        .unwrap_or_else(RequestId::generate);

    let span = tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %request_id.as_str(),
    );
    req.extensions_mut().insert(request_id.clone());

    async move {
        let started = Instant::now();
        let mut res = next.run(req).await;

        tracing::info!(
            status = res.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
            res.headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        res
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn missing_header_is_reported() {
        let err = extract_bearer(&HeaderMap::new()).unwrap_err();
        assert_eq!(err, ApiError::unauthorized(HEADER_REQUIRED));
    }

    #[test]
    fn well_formed_header_yields_token() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn other_shapes_are_format_errors() {
        for value in ["Basic abc", "Bearer", "bearer abc", "Bearer  abc", "Bearer a b", "abc"] {
            let err = extract_bearer(&headers(value)).unwrap_err();
            assert_eq!(err, ApiError::unauthorized(BAD_FORMAT), "{value:?}");
        }
    }

    #[test]
    fn empty_token_reaches_validation() {
        assert_eq!(extract_bearer(&headers("Bearer ")).unwrap(), "");
    }
}
