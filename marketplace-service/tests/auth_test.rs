//! Registration, login and refresh-rotation tests.

mod common;

use common::TestApp;
use serde_json::{Value, json};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn register_login_and_profile_roundtrip() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/auth/register",
            None,
            &json!({
                "email": "maria@example.com",
                "password": "password123",
                "name": "Maria Souza",
                "role": "producer"
            }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "maria@example.com");
    assert_eq!(body["data"]["role"], "producer");
    assert!(body["data"]["password_hash"].is_null(), "hash must not leak");

    let token = app.register_and_login("ana@example.com", "consumer").await;
    let response = app.get("/users/me", Some(&token)).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["email"], "ana@example.com");
    assert_eq!(body["data"]["role"], "consumer");
}

#[tokio::test]
#[serial]
async fn duplicate_email_is_rejected() {
    let app = TestApp::spawn().await;

    let payload = json!({
        "email": "dup@example.com",
        "password": "password123",
        "name": "First"
    });
    let response = app.post("/auth/register", None, &payload).await;
    assert_eq!(response.status(), 201);

    let response = app.post("/auth/register", None, &payload).await;
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[serial]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;
    app.register_and_login("joao@example.com", "consumer").await;

    let response = app
        .post(
            "/auth/login",
            None,
            &json!({"email": "joao@example.com", "password": "not-the-password"}),
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[serial]
async fn refresh_token_is_single_use() {
    let app = TestApp::spawn().await;
    app.register_and_login("rot@example.com", "consumer").await;

    let response = app
        .post(
            "/auth/login",
            None,
            &json!({"email": "rot@example.com", "password": "password123"}),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    let refresh_token = body["data"]["refresh_token"].as_str().unwrap().to_string();

    // First use rotates
    let response = app
        .post("/auth/refresh", None, &json!({"refresh_token": &refresh_token}))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["access_token"].as_str().is_some());

    // Second use of the consumed token fails
    let response = app
        .post("/auth/refresh", None, &json!({"refresh_token": &refresh_token}))
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[serial]
async fn protected_routes_require_token() {
    let app = TestApp::spawn().await;

    let response = app.get("/users/me", None).await;
    assert_eq!(response.status(), 401);

    let response = app.get("/cart", Some("not-a-jwt")).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[serial]
async fn validation_errors_use_envelope() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/auth/register",
            None,
            &json!({"email": "not-an-email", "password": "short", "name": "X"}),
        )
        .await;
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["errors"].as_array().is_some_and(|e| !e.is_empty()));
}
