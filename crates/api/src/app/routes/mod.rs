use axum::{routing::get, Router};

pub mod auth;
pub mod products;
pub mod system;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new().nest("/auth", auth::router())
}

/// Endpoints behind the auth middleware.
pub fn protected_router() -> Router {
    Router::new()
        .route("/profile", get(auth::profile))
        .nest("/products", products::router())
}
