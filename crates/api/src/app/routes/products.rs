use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};

use storefront_core::ProductId;
use storefront_infra::ListParams;
use storefront_products::{CreateProduct, ProductPatch};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn parse_id(raw: &str) -> Result<ProductId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation("invalid product id"))
}

/// A segment axum cannot decode (bad percent-encoding, invalid UTF-8) is
/// just another invalid id.
fn product_id(path: Result<Path<String>, PathRejection>) -> Result<ProductId, ApiError> {
    match path {
        Ok(Path(raw)) => parse_id(&raw),
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected product id");
            Err(ApiError::validation("invalid product id"))
        }
    }
}

/// Unreadable query strings count as absent parameters.
fn list_params(query: Result<Query<Vec<(String, String)>>, QueryRejection>) -> ListParams {
    match query {
        Ok(Query(pairs)) => ListParams::from_pairs(pairs),
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "ignoring unreadable query string");
            ListParams::default()
        }
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<CreateProduct>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let view = services.create_product(&principal, body).await?;
    Ok(dto::ok(StatusCode::CREATED, "product created successfully", view))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let params = list_params(query);
    let page = services.list_products(&params).await?;
    Ok(dto::paginated("products retrieved", page))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = product_id(path)?;
    let view = services.get_product(id).await?;
    Ok(dto::ok(StatusCode::OK, "product retrieved", view))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = product_id(path)?;
    let patch = body.map(|Json(patch)| patch).map_err(ApiError::from);
    let view = services.update_product(&principal, id, patch).await?;
    Ok(dto::ok(StatusCode::OK, "product updated successfully", view))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = product_id(path)?;
    services.delete_product(&principal, id).await?;
    Ok(dto::message_only(StatusCode::OK, "product deleted successfully"))
}
