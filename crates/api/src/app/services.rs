//! Application services: the operations behind each endpoint.
//!
//! Handlers stay thin (extract, call, wrap in an envelope); everything that
//! touches stores, hashing or tokens lives here.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use storefront_auth::{
    CredentialStore, Credentials, Hs256TokenService, OwnedAction, Registration, TokenIssuer,
    UserProfile,
};
use storefront_core::{ProductId, UserId};
use storefront_infra::{
    InMemoryStore, ListParams, Page, PageRequest, PostgresStore, ProductQueryEngine, ProductStore,
    StoreError, UserStore,
};
use storefront_products::{CreateProduct, Product, ProductPatch, ProductView};

use crate::app::dto::AuthResponse;
use crate::app::errors::ApiError;
use crate::authz::ensure_owner;
use crate::config::DatabaseConfig;
use crate::context::PrincipalContext;

const INVALID_LOGIN: &str = "invalid email or password";
const EMAIL_TAKEN: &str = "email already registered";
const PRODUCT_NOT_FOUND: &str = "product not found";

/// Shared, read-only service graph. Cloned per request via `Arc`.
pub struct AppServices {
    users: Arc<dyn UserStore>,
    products: Arc<dyn ProductStore>,
    tokens: Arc<Hs256TokenService>,
    credentials: CredentialStore,
    listing: ProductQueryEngine<Arc<dyn ProductStore>>,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl AppServices {
    pub fn new(
        users: Arc<dyn UserStore>,
        products: Arc<dyn ProductStore>,
        tokens: Arc<Hs256TokenService>,
    ) -> Self {
        let listing = ProductQueryEngine::new(products.clone());
        Self {
            users,
            products,
            tokens,
            credentials: CredentialStore::new(),
            listing,
        }
    }

    /// Everything backed by one in-memory store.
    pub fn in_memory(jwt_secret: &str) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(
            store.clone(),
            store,
            Arc::new(Hs256TokenService::new(jwt_secret)),
        )
    }

    /// Connect to Postgres and bootstrap the schema.
    pub async fn postgres(db: &DatabaseConfig, jwt_secret: &str) -> Result<Self, StoreError> {
        let store = Arc::new(PostgresStore::connect(&db.url, db.max_connections).await?);
        store.ensure_schema().await?;
        Ok(Self::new(
            store.clone(),
            store,
            Arc::new(Hs256TokenService::new(jwt_secret)),
        ))
    }

    pub fn tokens(&self) -> Arc<Hs256TokenService> {
        self.tokens.clone()
    }

    // -------------------------
    // Identity
    // -------------------------

    #[instrument(skip_all)]
    pub async fn register(&self, mut registration: Registration) -> Result<AuthResponse, ApiError> {
        registration.validate()?;

        let existing = self
            .users
            .user_by_email(&registration.email)
            .await
            .map_err(|e| ApiError::internal("failed to check email", e))?;
        if existing.is_some() {
            return Err(ApiError::conflict(EMAIL_TAKEN));
        }

        let password = std::mem::take(&mut registration.password);
        let digest = self.hash_password(password).await?;

        let user = match self.users.create_user(registration.into_new_user(digest)).await {
            Ok(user) => user,
            Err(StoreError::Conflict { .. }) => return Err(ApiError::conflict(EMAIL_TAKEN)),
            Err(e) => return Err(ApiError::internal("failed to create user", e)),
        };
        tracing::info!(user_id = %user.id, "user registered");

        let token = self.issue_token(user.id)?;
        Ok(AuthResponse {
            token,
            user: user.profile(),
        })
    }

    #[instrument(skip_all)]
    pub async fn login(&self, credentials: Credentials) -> Result<AuthResponse, ApiError> {
        credentials.validate()?;

        let user = self
            .users
            .user_by_email(&credentials.email)
            .await
            .map_err(|e| ApiError::internal("failed to find user", e))?
            .ok_or_else(|| ApiError::unauthorized(INVALID_LOGIN))?;

        let digest = user.password_hash.clone();
        if !self.verify_password(credentials.password, digest).await? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(ApiError::unauthorized(INVALID_LOGIN));
        }

        let token = self.issue_token(user.id)?;
        Ok(AuthResponse {
            token,
            user: user.profile(),
        })
    }

    pub async fn profile(&self, principal: &PrincipalContext) -> Result<UserProfile, ApiError> {
        self.users
            .user_by_id(principal.user_id())
            .await
            .map_err(|e| ApiError::internal("failed to get user", e))?
            .map(|u| u.profile())
            .ok_or_else(|| ApiError::not_found("user not found"))
    }

    fn issue_token(&self, subject: UserId) -> Result<String, ApiError> {
        self.tokens
            .issue(subject, Utc::now())
            .map_err(|e| ApiError::internal("failed to generate token", e))
    }

    /// Argon2 is deliberately slow; keep it off the async workers.
    async fn hash_password(&self, password: String) -> Result<String, ApiError> {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || credentials.hash(&password))
            .await
            .map_err(|e| ApiError::internal("failed to hash password", e))?
            .map_err(|e| ApiError::internal("failed to hash password", e))
    }

    async fn verify_password(&self, password: String, digest: String) -> Result<bool, ApiError> {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || credentials.verify(&password, &digest))
            .await
            .map_err(|e| ApiError::internal("failed to verify password", e))
    }

    // -------------------------
    // Products
    // -------------------------

    #[instrument(skip(self, body), fields(owner_id = %principal.user_id()))]
    pub async fn create_product(
        &self,
        principal: &PrincipalContext,
        body: CreateProduct,
    ) -> Result<ProductView, ApiError> {
        let new_product = body.into_new_product(principal.user_id())?;

        let created = self
            .products
            .create_product(new_product)
            .await
            .map_err(|e| ApiError::internal("failed to create product", e))?;

        self.products
            .product_view(created.id)
            .await
            .map_err(|e| ApiError::internal("failed to create product", e))?
            .ok_or(ApiError::Internal("failed to create product"))
    }

    pub async fn get_product(&self, id: ProductId) -> Result<ProductView, ApiError> {
        self.products
            .product_view(id)
            .await
            .map_err(|e| ApiError::internal("failed to get product", e))?
            .ok_or_else(|| ApiError::not_found(PRODUCT_NOT_FOUND))
    }

    pub async fn list_products(&self, params: &ListParams) -> Result<Page<ProductView>, ApiError> {
        let request = PageRequest::from(params);
        self.listing
            .list(&request)
            .await
            .map_err(|e| ApiError::internal("failed to list products", e))
    }

    /// Load, check ownership, then validate and apply the patch.
    ///
    /// `patch` arrives still carrying any body rejection so that a missing
    /// product or a foreign owner is reported before a malformed body.
    #[instrument(skip(self, patch), fields(caller = %principal.user_id(), product_id = %id))]
    pub async fn update_product(
        &self,
        principal: &PrincipalContext,
        id: ProductId,
        patch: Result<ProductPatch, ApiError>,
    ) -> Result<ProductView, ApiError> {
        let product = self.load_product(id, "failed to update product").await?;
        ensure_owner(&product, principal, OwnedAction::Update)?;

        let changes = patch?.into_changes()?;
        let updated = self
            .products
            .update_product(id, &changes)
            .await
            .map_err(|e| ApiError::internal("failed to update product", e))?;
        if !updated {
            return Err(ApiError::not_found(PRODUCT_NOT_FOUND));
        }

        self.products
            .product_view(id)
            .await
            .map_err(|e| ApiError::internal("failed to update product", e))?
            .ok_or_else(|| ApiError::not_found(PRODUCT_NOT_FOUND))
    }

    #[instrument(skip(self), fields(caller = %principal.user_id(), product_id = %id))]
    pub async fn delete_product(&self, principal: &PrincipalContext, id: ProductId) -> Result<(), ApiError> {
        let product = self.load_product(id, "failed to delete product").await?;
        ensure_owner(&product, principal, OwnedAction::Delete)?;

        let deleted = self
            .products
            .soft_delete_product(id)
            .await
            .map_err(|e| ApiError::internal("failed to delete product", e))?;
        if !deleted {
            return Err(ApiError::not_found(PRODUCT_NOT_FOUND));
        }
        Ok(())
    }

    async fn load_product(&self, id: ProductId, failure: &'static str) -> Result<Product, ApiError> {
        self.products
            .product_by_id(id)
            .await
            .map_err(|e| ApiError::internal(failure, e))?
            .ok_or_else(|| ApiError::not_found(PRODUCT_NOT_FOUND))
    }
}
