//! In-memory store for tests/dev.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use storefront_auth::{NewUser, User};
use storefront_core::{ProductId, UserId};
use storefront_products::{NewProduct, Product, ProductChange, ProductView};

use super::{ProductStore, StoreError, UserStore};
use crate::query::ProductFilter;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    last_user_id: i64,
    last_product_id: i64,
}

/// Both tables behind one lock, so every call is atomic like a single SQL
/// statement would be.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, operation: &'static str) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))
    }

    fn write(&self, operation: &'static str) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))
    }
}

impl Tables {
    fn live_product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id).filter(|p| !p.is_deleted())
    }

    fn view(&self, product: &Product) -> Option<ProductView> {
        let owner = self.users.get(&product.user_id)?;
        Some(ProductView {
            product: product.clone(),
            user: owner.profile(),
        })
    }

    fn matching<'a>(&'a self, filter: &'a ProductFilter) -> impl Iterator<Item = &'a Product> + 'a {
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        self.products.values().filter(move |p| {
            if p.is_deleted() {
                return false;
            }
            match &needle {
                Some(n) => p.name.to_lowercase().contains(n) || p.description.to_lowercase().contains(n),
                None => true,
            }
        })
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read("user_by_id")?.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.read("user_by_email")?;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write("create_user")?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::conflict("create_user", "email already exists"));
        }

        tables.last_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: UserId::new(tables.last_user_id),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut tables = self.write("create_product")?;
        if !tables.users.contains_key(&product.user_id) {
            return Err(StoreError::backend("create_product", "owner does not exist"));
        }

        tables.last_product_id += 1;
        let now = Utc::now();
        let created = Product {
            id: ProductId::new(tables.last_product_id),
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            user_id: product.user_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read("product_by_id")?.live_product(id).cloned())
    }

    async fn product_view(&self, id: ProductId) -> Result<Option<ProductView>, StoreError> {
        let tables = self.read("product_view")?;
        Ok(tables.live_product(id).and_then(|p| tables.view(p)))
    }

    async fn update_product(&self, id: ProductId, changes: &[ProductChange]) -> Result<bool, StoreError> {
        let mut tables = self.write("update_product")?;
        match tables.products.get_mut(&id).filter(|p| !p.is_deleted()) {
            Some(product) => {
                product.apply(changes, Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let mut tables = self.write("soft_delete_product")?;
        match tables.products.get_mut(&id).filter(|p| !p.is_deleted()) {
            Some(product) => {
                product.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let tables = self.read("count_products")?;
        Ok(tables.matching(filter).count() as u64)
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<ProductView>, StoreError> {
        let tables = self.read("list_products")?;

        let mut rows: Vec<&Product> = tables.matching(filter).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .filter_map(|p| tables.view(p))
            .collect())
    }
}
