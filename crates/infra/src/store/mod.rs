//! Persistence collaborator boundary.
//!
//! Handlers and the listing engine only see these traits; the concrete
//! adapter (Postgres or in-memory) is chosen once at startup and injected.
//! Every call is a single-row (or single-statement) operation; concurrent
//! updates to the same row rely on the backend's own atomicity.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use storefront_auth::{NewUser, User};
use storefront_core::{ProductId, UserId};
use storefront_products::{NewProduct, Product, ProductChange, ProductView};

use crate::query::ProductFilter;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict in {operation}: {message}")]
    Conflict { operation: &'static str, message: String },

    /// Any other backend failure (connection, query, decoding, poisoned lock).
    #[error("storage failure in {operation}: {message}")]
    Backend { operation: &'static str, message: String },
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend { operation, message: message.into() }
    }

    pub fn conflict(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict { operation, message: message.into() }
    }
}

/// Account records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Exact (case-sensitive) match on the stored email.
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the email is already taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
}

/// Product records. Soft-deleted rows are invisible to every method.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Product joined (read-only) with its owner's profile.
    async fn product_view(&self, id: ProductId) -> Result<Option<ProductView>, StoreError>;

    /// Apply a sparse change set. `Ok(false)` if the product does not exist.
    /// An empty change set leaves the row untouched.
    async fn update_product(&self, id: ProductId, changes: &[ProductChange]) -> Result<bool, StoreError>;

    /// Mark the product deleted. `Ok(false)` if it does not exist.
    async fn soft_delete_product(&self, id: ProductId) -> Result<bool, StoreError>;

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError>;

    /// Newest first (`created_at DESC, id DESC`).
    async fn list_products(
        &self,
        filter: &ProductFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<ProductView>, StoreError>;
}

#[async_trait]
impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).user_by_id(id).await
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        (**self).user_by_email(email).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        (**self).create_user(user).await
    }
}

#[async_trait]
impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        (**self).create_product(product).await
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).product_by_id(id).await
    }

    async fn product_view(&self, id: ProductId) -> Result<Option<ProductView>, StoreError> {
        (**self).product_view(id).await
    }

    async fn update_product(&self, id: ProductId, changes: &[ProductChange]) -> Result<bool, StoreError> {
        (**self).update_product(id, changes).await
    }

    async fn soft_delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        (**self).soft_delete_product(id).await
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        (**self).count_products(filter).await
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<ProductView>, StoreError> {
        (**self).list_products(filter, limit, offset).await
    }
}
