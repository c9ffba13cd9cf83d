//! Infrastructure layer: persistence adapters and the product listing engine.

pub mod query;
pub mod store;

pub use query::{ListParams, Page, PageMeta, PageRequest, ProductFilter, ProductQueryEngine};
pub use store::{InMemoryStore, PostgresStore, ProductStore, StoreError, UserStore};
