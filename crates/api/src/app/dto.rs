//! Response envelopes.
//!
//! Every body is `{success, message, data?}`; list responses add `meta`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use storefront_auth::UserProfile;
use storefront_infra::{Page, PageMeta};

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

/// Token plus the public profile it was issued for.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

pub fn ok<T: Serialize>(status: StatusCode, message: &'static str, data: T) -> Response {
    let body = Envelope {
        success: true,
        message,
        data: Some(data),
        meta: None,
    };
    (status, Json(body)).into_response()
}

pub fn message_only(status: StatusCode, message: &'static str) -> Response {
    let body: Envelope<()> = Envelope {
        success: true,
        message,
        data: None,
        meta: None,
    };
    (status, Json(body)).into_response()
}

pub fn paginated<T: Serialize>(message: &'static str, page: Page<T>) -> Response {
    let body = Envelope {
        success: true,
        message,
        data: Some(page.items),
        meta: Some(page.meta),
    };
    (StatusCode::OK, Json(body)).into_response()
}
