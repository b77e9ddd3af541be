//! Cart management tests.

mod common;

use common::TestApp;
use serde_json::{Value, json};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn cart_accumulates_and_updates_quantities() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Carrots", "5.00", 50)
        .await;

    app.add_to_cart(&buyer, product, 2).await;
    app.add_to_cart(&buyer, product, 3).await;

    let response = app.get("/cart", Some(&buyer)).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1, "same product accumulates into one line");
    assert_eq!(items[0]["quantity"], 5);

    // Replace the quantity outright
    let cart_item_id = items[0]["cart_item_id"].as_str().unwrap();
    let response = app
        .put(
            &format!("/cart/items/{}", cart_item_id),
            Some(&buyer),
            &json!({"quantity": 1}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app.get("/cart", Some(&buyer)).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["items"][0]["quantity"], 1);

    // Remove the line
    let response = app
        .delete(&format!("/cart/items/{}", cart_item_id), Some(&buyer))
        .await;
    assert_eq!(response.status(), 200);

    let response = app.get("/cart", Some(&buyer)).await;
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn inactive_product_cannot_be_added() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Beets", "2.00", 10)
        .await;

    let response = app
        .delete(&format!("/products/{}", product), Some(&producer))
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .post(
            "/cart/items",
            Some(&buyer),
            &json!({"product_id": product, "quantity": 1}),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[serial]
async fn zero_quantity_is_rejected() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Kale", "3.00", 10)
        .await;

    let response = app
        .post(
            "/cart/items",
            Some(&buyer),
            &json!({"product_id": product, "quantity": 0}),
        )
        .await;
    assert_eq!(response.status(), 422);
}
