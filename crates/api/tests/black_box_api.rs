use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use storefront_api::app::{build_app, AppServices};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over the in-memory store, on an ephemeral port.
        let app = build_app(AppServices::in_memory(JWT_SECRET));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, sub: &str, exp_offset: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = json!({
        "sub": sub,
        "iat": (now - ChronoDuration::hours(1)).timestamp(),
        "exp": (now + exp_offset).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// Register and return `(token, user id)`.
async fn register(client: &reqwest::Client, srv: &TestServer, name: &str, email: &str) -> (String, i64) {
    let res = client
        .post(srv.url("/api/auth/register"))
        .json(&json!({ "name": name, "email": email, "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    (
        body["data"]["token"].as_str().unwrap().to_string(),
        body["data"]["user"]["id"].as_i64().unwrap(),
    )
}

async fn create_product(client: &reqwest::Client, srv: &TestServer, token: &str, body: Value) -> Value {
    let res = client
        .post(srv.url("/api/products"))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap();
    if res.status() != StatusCode::CREATED {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        panic!("expected 201 from create, got {status} body={body}");
    }
    let body: Value = res.json().await.unwrap();
    body["data"].clone()
}

#[tokio::test]
async fn health_is_public_and_tagged_with_request_id() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));

    let res = client
        .get(srv.url("/health"))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me-123");
}

#[tokio::test]
async fn register_login_and_profile() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/auth/register"))
        .json(&json!({ "name": "Alice", "email": "a@x.com", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "user registered successfully");
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["data"]["user"]["email"], "a@x.com");
    assert!(body["data"]["user"].get("password_hash").is_none());

    // Same email again.
    let res = client
        .post(srv.url("/api/auth/register"))
        .json(&json!({ "name": "Other", "email": "a@x.com", "password": "secret2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "message": "email already registered" }));

    // Wrong password and unknown email look the same.
    for (email, password) in [("a@x.com", "wrong-pass"), ("nobody@x.com", "secret1")] {
        let res = client
            .post(srv.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "invalid email or password");
    }

    let res = client
        .post(srv.url("/api/auth/login"))
        .json(&json!({ "email": "a@x.com", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "login successful");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url("/api/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "profile retrieved");
    assert_eq!(body["data"]["name"], "Alice");
    assert_eq!(body["data"]["email"], "a@x.com");
}

#[tokio::test]
async fn invalid_bodies_get_the_error_envelope() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/auth/register"))
        .json(&json!({ "name": "Short", "email": "s@x.com", "password": "12345" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);

    let res = client
        .post(srv.url("/api/auth/register"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "message": "invalid request body" }));
}

#[tokio::test]
async fn profile_of_an_unknown_subject_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Well-signed, but no such user in the store.
    let token = mint_jwt(JWT_SECRET, "999", ChronoDuration::hours(1));
    let res = client
        .get(srv.url("/api/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "message": "user not found" }));
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "authorization header required");

    let res = client
        .get(srv.url("/api/products"))
        .header("authorization", "Token abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "invalid authorization format, use: Bearer <token>");

    let foreign = mint_jwt("some-other-secret", "1", ChronoDuration::hours(1));
    let expired = mint_jwt(JWT_SECRET, "1", ChronoDuration::seconds(-5));
    for token in ["garbage", foreign.as_str(), expired.as_str()] {
        let res = client
            .get(srv.url("/api/profile"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "invalid or expired token");
    }
}

#[tokio::test]
async fn only_the_owner_can_update_or_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (token_a, id_a) = register(&client, &srv, "Alice", "a@x.com").await;
    let (token_b, _) = register(&client, &srv, "Bob", "b@x.com").await;

    let created = create_product(
        &client,
        &srv,
        &token_a,
        json!({ "name": "Widget", "description": "blue", "price": 9.99, "stock": 5 }),
    )
    .await;
    assert_eq!(created["user"]["id"], id_a);
    assert_eq!(created["user"]["name"], "Alice");
    let id = created["id"].as_i64().unwrap();

    // Bob cannot touch it.
    let res = client
        .put(srv.url(&format!("/api/products/{id}")))
        .bearer_auth(&token_b)
        .json(&json!({ "price": 1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "you can only update your own products");

    let res = client
        .delete(srv.url(&format!("/api/products/{id}")))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "you can only delete your own products");

    // Unchanged, and readable by anyone authenticated.
    let res = client
        .get(srv.url(&format!("/api/products/{id}")))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["price"], 9.99);

    // Alice patches one field; the rest is preserved.
    let res = client
        .put(srv.url(&format!("/api/products/{id}")))
        .bearer_auth(&token_a)
        .json(&json!({ "price": 4.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "product updated successfully");
    assert_eq!(body["data"]["price"], 4.5);
    assert_eq!(body["data"]["name"], "Widget");
    assert_eq!(body["data"]["stock"], 5);
    assert_eq!(body["data"]["user"]["id"], id_a);

    // Invalid patch values are rejected after the ownership check.
    let res = client
        .put(srv.url(&format!("/api/products/{id}")))
        .bearer_auth(&token_a)
        .json(&json!({ "stock": -1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .delete(srv.url(&format!("/api/products/{id}")))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "message": "product deleted successfully" }));

    // Soft-deleted products are gone from every path.
    let res = client
        .get(srv.url(&format!("/api/products/{id}")))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "product not found");

    let res = client
        .delete(srv.url(&format!("/api/products/{id}")))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_reports_missing_or_foreign_products_before_a_bad_body() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (token_a, _) = register(&client, &srv, "Alice", "a@x.com").await;
    let (token_b, _) = register(&client, &srv, "Bob", "b@x.com").await;
    let created = create_product(
        &client,
        &srv,
        &token_a,
        json!({ "name": "Widget", "price": 9.99, "stock": 5 }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .put(srv.url(&format!("/api/products/{id}")))
        .bearer_auth(&token_b)
        .json(&json!({ "stock": "lots" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "message": "you can only update your own products" }));

    let res = client
        .put(srv.url("/api/products/999"))
        .bearer_auth(&token_a)
        .json(&json!({ "stock": 1.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "message": "product not found" }));

    // The owner still gets the body error.
    let res = client
        .put(srv.url(&format!("/api/products/{id}")))
        .bearer_auth(&token_a)
        .json(&json!({ "stock": "lots" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "message": "invalid request body" }));
}

#[tokio::test]
async fn product_input_is_validated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = register(&client, &srv, "Alice", "a@x.com").await;

    for body in [
        json!({ "name": "W", "price": 1.0 }),
        json!({ "name": "Widget", "price": 0 }),
        json!({ "name": "Widget" }),
        json!({ "name": "Widget", "price": 1.0, "stock": -3 }),
    ] {
        let res = client
            .post(srv.url("/api/products"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
    }

    let res = client
        .get(srv.url("/api/products/abc"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "invalid product id");

    // Undecodable segments get the same envelope.
    let res = client
        .get(srv.url("/api/products/%FF"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "message": "invalid product id" }));

    let res = client
        .get(srv.url("/api/products/999"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_paginates_and_searches() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = register(&client, &srv, "Alice", "a@x.com").await;

    for i in 0..7 {
        let description = if i == 2 { "a WIDGET-shaped lamp" } else { "plain" };
        create_product(
            &client,
            &srv,
            &token,
            json!({ "name": format!("Item {i}"), "description": description, "price": 1.5 }),
        )
        .await;
    }

    let res = client
        .get(srv.url("/api/products?limit=3"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "products retrieved");
    assert_eq!(body["meta"], json!({ "page": 1, "limit": 3, "total": 7, "totalPages": 3 }));
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Item 6", "Item 5", "Item 4"]);
    assert!(body["data"][0]["user"]["email"].is_string());

    let res = client
        .get(srv.url("/api/products?limit=3&page=3"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Garbage and out-of-range values fall back to defaults.
    let res = client
        .get(srv.url("/api/products?limit=abc&page=-2"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["meta"]["page"], 1);
    assert_eq!(body["meta"]["limit"], 10);

    // Repeated keys: the first value wins.
    let res = client
        .get(srv.url("/api/products?page=1&page=2&limit=3"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["meta"]["page"], 1);
    assert_eq!(body["data"][0]["name"], "Item 6");

    let res = client
        .get(srv.url("/api/products?search=widget"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "Item 2");
}
