//! Postgres-backed store implementation.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / PoolTimedOut / Io / other | N/A | `Backend` |
//!
//! ## Soft Deletes
//!
//! Every read and write filters on `deleted_at IS NULL`; deletion only sets
//! the marker. The owner join in listing queries is a plain `SELECT`, so
//! owner rows are never locked.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{instrument, Span};

use storefront_auth::{NewUser, User, UserProfile};
use storefront_core::{ProductId, UserId};
use storefront_products::{NewProduct, Product, ProductChange, ProductView};

use super::{ProductStore, StoreError, UserStore};
use crate::query::ProductFilter;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

const PRODUCT_COLUMNS: &str = r#"
    p.id, p.name, p.description, p.price, p.stock, p.user_id,
    p.created_at, p.updated_at, p.deleted_at
"#;

const VIEW_COLUMNS: &str = r#"
    p.id, p.name, p.description, p.price, p.stock, p.user_id,
    p.created_at, p.updated_at, p.deleted_at,
    u.name AS owner_name, u.email AS owner_email
"#;

/// Postgres-backed users + products store.
///
/// `PgPool` is internally reference counted; cloning the store is cheap and
/// all clones share one pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("user_by_id", e))?;

        row.map(|r| user_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("user_by_id", e))
    }

    #[instrument(skip(self, email), err)]
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("user_by_email", e))?;

        row.map(|r| user_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("user_by_email", e))
    }

    #[instrument(skip(self, user), fields(user_id = tracing::field::Empty), err)]
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;

        let created = user_from_row(&row).map_err(|e| map_sqlx_error("create_user", e))?;
        Span::current().record("user_id", created.id.get());
        Ok(created)
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    #[instrument(skip(self, product), fields(owner_id = %product.user_id), err)]
    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, description, price, stock, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, price, stock, user_id,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.user_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;

        product_from_row(&row).map_err(|e| map_sqlx_error("create_product", e))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1 AND p.deleted_at IS NULL");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_by_id", e))?;

        row.map(|r| product_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("product_by_id", e))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product_view(&self, id: ProductId) -> Result<Option<ProductView>, StoreError> {
        let sql = format!(
            "SELECT {VIEW_COLUMNS} FROM products p JOIN users u ON u.id = p.user_id \
             WHERE p.id = $1 AND p.deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_view", e))?;

        row.map(|r| view_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("product_view", e))
    }

    #[instrument(skip(self, changes), fields(product_id = %id, change_count = changes.len()), err)]
    async fn update_product(&self, id: ProductId, changes: &[ProductChange]) -> Result<bool, StoreError> {
        if changes.is_empty() {
            return Ok(self.product_by_id(id).await?.is_some());
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE products SET ");
        {
            let mut assignments = qb.separated(", ");
            for change in changes {
                assignments.push(change.column());
                assignments.push_unseparated(" = ");
                match change {
                    ProductChange::Name(v) | ProductChange::Description(v) => {
                        assignments.push_bind_unseparated(v.clone());
                    }
                    ProductChange::Price(v) => {
                        assignments.push_bind_unseparated(*v);
                    }
                    ProductChange::Stock(v) => {
                        assignments.push_bind_unseparated(*v);
                    }
                }
            }
            assignments.push("updated_at = NOW()");
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id.get());
        qb.push(" AND deleted_at IS NULL");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn soft_delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("soft_delete_product", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM products p
            WHERE p.deleted_at IS NULL
                AND ($1::text IS NULL OR p.name ILIKE $1 OR p.description ILIKE $1)
            "#,
        )
        .bind(like_pattern(filter))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_products", e))?;

        let total: i64 = row
            .try_get("total")
            .map_err(|e| map_sqlx_error("count_products", e))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    #[instrument(skip(self), err)]
    async fn list_products(
        &self,
        filter: &ProductFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<ProductView>, StoreError> {
        let sql = format!(
            r#"
            SELECT {VIEW_COLUMNS}
            FROM products p
            JOIN users u ON u.id = p.user_id
            WHERE p.deleted_at IS NULL
                AND ($1::text IS NULL OR p.name ILIKE $1 OR p.description ILIKE $1)
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(like_pattern(filter))
            .bind(i64::from(limit))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter()
            .map(view_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_products", e))
    }
}

/// `%term%` with LIKE metacharacters escaped, so the term matches literally.
fn like_pattern(filter: &ProductFilter) -> Option<String> {
    filter.search.as_ref().map(|term| {
        let mut escaped = String::with_capacity(term.len() + 2);
        escaped.push('%');
        for c in term.chars() {
            if matches!(c, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    })
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        stock: row.try_get("stock")?,
        user_id: UserId::new(row.try_get("user_id")?),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        deleted_at: row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?,
    })
}

fn view_from_row(row: &PgRow) -> Result<ProductView, sqlx::Error> {
    let product = product_from_row(row)?;
    let user = UserProfile {
        id: product.user_id,
        name: row.try_get("owner_name")?,
        email: row.try_get("owner_email")?,
    };
    Ok(ProductView { product, user })
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::conflict(operation, msg),
                _ => StoreError::backend(operation, msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::backend(operation, "connection pool closed"),
        sqlx::Error::PoolTimedOut => StoreError::backend(operation, "timed out acquiring a connection"),
        other => StoreError::backend(operation, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern(&ProductFilter::default()), None);
        assert_eq!(like_pattern(&ProductFilter::search("lamp")).as_deref(), Some("%lamp%"));
        assert_eq!(
            like_pattern(&ProductFilter::search("50%_off\\")).as_deref(),
            Some("%50\\%\\_off\\\\%")
        );
    }

    #[test]
    fn schema_declares_both_tables() {
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS users"));
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS products"));
        assert!(SCHEMA.contains("REFERENCES users (id)"));
    }
}
