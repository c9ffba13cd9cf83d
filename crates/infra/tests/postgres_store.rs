//! Runs against a live Postgres when `DATABASE_URL` is set; otherwise each
//! test returns early.

use storefront_auth::NewUser;
use storefront_core::ProductId;
use storefront_infra::{
    PageRequest, PostgresStore, ProductQueryEngine, ProductStore, StoreError, UserStore,
};
use storefront_products::{NewProduct, ProductChange};

async fn store() -> Option<PostgresStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let store = PostgresStore::connect(&url, 2).await.expect("connect");
    store.ensure_schema().await.expect("schema");
    Some(store)
}

fn unique_email(tag: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{tag}-{nanos}@storefront.test")
}

#[tokio::test]
async fn duplicate_email_maps_to_conflict() {
    let Some(store) = store().await else { return };
    let email = unique_email("dup");
    let new_user = || NewUser {
        name: "Dup".into(),
        email: email.clone(),
        password_hash: "$argon2id$stub".into(),
    };

    store.create_user(new_user()).await.unwrap();
    let err = store.create_user(new_user()).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
}

#[tokio::test]
async fn product_lifecycle_respects_soft_delete() {
    let Some(store) = store().await else { return };
    let owner = store
        .create_user(NewUser {
            name: "Owner".into(),
            email: unique_email("owner"),
            password_hash: "$argon2id$stub".into(),
        })
        .await
        .unwrap();

    let marker = unique_email("marker");
    let product = store
        .create_product(NewProduct {
            name: "Widget".into(),
            description: marker.clone(),
            price: 9.5,
            stock: 3,
            user_id: owner.id,
        })
        .await
        .unwrap();

    assert!(store.update_product(product.id, &[ProductChange::Stock(7)]).await.unwrap());
    let view = store.product_view(product.id).await.unwrap().unwrap();
    assert_eq!(view.product.stock, 7);
    assert_eq!(view.product.price, 9.5);
    assert_eq!(view.user.email, owner.email);

    let engine = ProductQueryEngine::new(store.clone());
    let page = engine.list(&PageRequest::new(1, 10, &marker)).await.unwrap();
    assert_eq!(page.meta.total, 1);

    assert!(store.soft_delete_product(product.id).await.unwrap());
    assert!(store.product_by_id(product.id).await.unwrap().is_none());
    assert!(!store.soft_delete_product(product.id).await.unwrap());

    let page = engine.list(&PageRequest::new(1, 10, &marker)).await.unwrap();
    assert_eq!(page.meta.total, 0);
}

#[tokio::test]
async fn missing_product_is_none() {
    let Some(store) = store().await else { return };
    assert!(store.product_view(ProductId::new(i64::MAX)).await.unwrap().is_none());
    assert!(!store.update_product(ProductId::new(i64::MAX), &[]).await.unwrap());
}
