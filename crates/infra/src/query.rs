//! Paginated, searchable product listing.
//!
//! Normalization policy:
//! - `page < 1` (or unparsable) becomes `1`.
//! - `limit` outside `[1, 100]` (or unparsable) becomes the default `10`.
//! - A blank search term means "no filter"; otherwise name OR description
//!   must contain it, case-insensitively.
//!
//! Results are ordered newest first, ties broken by id descending.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use storefront_products::ProductView;

use crate::store::{ProductStore, StoreError};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Raw listing parameters as they arrive on the query string.
///
/// Kept as strings so that garbage values fall back to defaults instead of
/// rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    /// Build from decoded query pairs. The first occurrence of a repeated
    /// key wins; unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                "search" => &mut params.search,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

/// Search criteria shared by the count and page queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Trimmed, non-empty term; `None` matches everything.
    pub search: Option<String>,
}

impl ProductFilter {
    pub fn search(term: &str) -> Self {
        let term = term.trim();
        Self {
            search: (!term.is_empty()).then(|| term.to_string()),
        }
    }
}

/// Normalized page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u32,
    pub filter: ProductFilter,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64, search: &str) -> Self {
        let page = if page < 1 { 1 } else { page as u64 };
        let limit = match u32::try_from(limit) {
            Ok(l) if (1..=MAX_PAGE_LIMIT).contains(&l) => l,
            _ => DEFAULT_PAGE_LIMIT,
        };

        Self {
            page,
            limit,
            filter: ProductFilter::search(search),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(u64::from(self.limit))
    }
}

impl From<&ListParams> for PageRequest {
    fn from(params: &ListParams) -> Self {
        let page = parse_or(params.page.as_deref(), 1);
        let limit = parse_or(params.limit.as_deref(), i64::from(DEFAULT_PAGE_LIMIT));
        Self::new(page, limit, params.search.as_deref().unwrap_or(""))
    }
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(default)
}

/// Pagination metadata returned alongside a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u64,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(page: u64, limit: u32, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(u64::from(limit.max(1))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

/// Computes listing pages over a [`ProductStore`].
#[derive(Debug, Clone)]
pub struct ProductQueryEngine<S> {
    store: S,
}

impl<S: ProductStore> ProductQueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// `total` is counted over the whole filtered set, before paging.
    #[instrument(skip(self), fields(page = request.page, limit = request.limit), err)]
    pub async fn list(&self, request: &PageRequest) -> Result<Page<ProductView>, StoreError> {
        let total = self.store.count_products(&request.filter).await?;
        let items = self
            .store
            .list_products(&request.filter, request.limit, request.offset())
            .await?;

        Ok(Page {
            items,
            meta: PageMeta::new(request.page, request.limit, total),
        })
    }
}
