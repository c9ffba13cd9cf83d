use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_auth::{OwnedResource, UserProfile};
use storefront_core::{DomainError, DomainResult, ProductId, UserId};

/// Minimum product name length (after trimming).
pub const MIN_NAME_LEN: usize = 2;

/// A catalog product owned by a registered account.
///
/// # Invariants
/// - `user_id` (the owner) is fixed at creation and never changes.
/// - `price > 0` and `stock >= 0` at all times.
/// - Once `deleted_at` is set the product is invisible to every read path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Apply an already-validated change set. The owner is never touched.
    pub fn apply(&mut self, changes: &[ProductChange], now: DateTime<Utc>) {
        if changes.is_empty() {
            return;
        }

        for change in changes {
            match change {
                ProductChange::Name(v) => self.name = v.clone(),
                ProductChange::Description(v) => self.description = v.clone(),
                ProductChange::Price(v) => self.price = *v,
                ProductChange::Stock(v) => self.stock = *v,
            }
        }
        self.updated_at = now;
    }
}

impl OwnedResource for Product {
    const KIND: &'static str = "product";

    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

/// Product joined with its owner's public profile (read model).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub user: UserProfile,
}

/// Create payload as submitted by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: i32,
}

impl CreateProduct {
    /// Validate and bind to the creating account.
    pub fn into_new_product(self, owner: UserId) -> DomainResult<NewProduct> {
        let name = validate_name(&self.name)?;
        let price = match self.price {
            Some(p) => validate_price(p)?,
            None => return Err(DomainError::validation("price is required")),
        };
        let stock = validate_stock(self.stock)?;

        Ok(NewProduct {
            name,
            description: self.description,
            price,
            stock,
            user_id: owner,
        })
    }
}

/// Insert payload for a validated product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub user_id: UserId,
}

/// One field assignment in a sparse update.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductChange {
    Name(String),
    Description(String),
    Price(f64),
    Stock(i32),
}

impl ProductChange {
    /// Column name in the products table.
    pub fn column(&self) -> &'static str {
        match self {
            ProductChange::Name(_) => "name",
            ProductChange::Description(_) => "description",
            ProductChange::Price(_) => "price",
            ProductChange::Stock(_) => "stock",
        }
    }
}

/// Partial update: absent fields are left as they are, never defaulted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
}

impl ProductPatch {
    /// Validate the present fields and turn them into a change set.
    pub fn into_changes(self) -> DomainResult<Vec<ProductChange>> {
        let mut changes = Vec::with_capacity(4);

        if let Some(name) = self.name {
            changes.push(ProductChange::Name(validate_name(&name)?));
        }
        if let Some(description) = self.description {
            changes.push(ProductChange::Description(description));
        }
        if let Some(price) = self.price {
            changes.push(ProductChange::Price(validate_price(price)?));
        }
        if let Some(stock) = self.stock {
            changes.push(ProductChange::Stock(validate_stock(stock)?));
        }

        Ok(changes)
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(DomainError::validation(format!(
            "name must be at least {MIN_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_price(price: f64) -> DomainResult<f64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(DomainError::validation("price must be greater than 0"));
    }
    Ok(price)
}

fn validate_stock(stock: i32) -> DomainResult<i32> {
    if stock < 0 {
        return Err(DomainError::validation("stock must not be negative"));
    }
    Ok(stock)
}
