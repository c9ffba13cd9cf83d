//! Products domain module.
//!
//! Business rules for owned catalog products, implemented as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod product;

pub use product::{
    CreateProduct, NewProduct, Product, ProductChange, ProductPatch, ProductView,
    MIN_NAME_LEN,
};
