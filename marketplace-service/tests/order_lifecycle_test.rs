//! Order lifecycle tests: cancellation, stock restore and status
//! progression guards.

mod common;

use common::TestApp;
use serde_json::{Value, json};
use serial_test::serial;
use uuid::Uuid;

/// Place an order of `quantity` units and return its id.
async fn place_order(app: &TestApp, buyer: &str, product: Uuid, quantity: i32) -> String {
    app.add_to_cart(buyer, product, quantity).await;
    let response = app.post("/orders", Some(buyer), &json!({})).await;
    assert_eq!(response.status(), 201, "order placement failed");
    let body: Value = response.json().await.unwrap();
    body["data"]["order"]["order_id"].as_str().unwrap().to_string()
}

#[tokio::test]
#[serial]
async fn cancellation_restores_stock() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Carrots", "5.00", 10)
        .await;

    let order_id = place_order(&app, &buyer, product, 3).await;
    assert_eq!(app.stock_of(product).await, 7);

    let response = app
        .post(&format!("/orders/{}/cancel", order_id), Some(&buyer), &json!({}))
        .await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(app.stock_of(product).await, 10);
}

#[tokio::test]
#[serial]
async fn cancelled_order_cannot_be_cancelled_again() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Carrots", "5.00", 10)
        .await;

    let order_id = place_order(&app, &buyer, product, 2).await;

    let response = app
        .post(&format!("/orders/{}/cancel", order_id), Some(&buyer), &json!({}))
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .post(&format!("/orders/{}/cancel", order_id), Some(&buyer), &json!({}))
        .await;
    assert_eq!(response.status(), 400);

    // Stock is restored exactly once
    assert_eq!(app.stock_of(product).await, 10);
}

#[tokio::test]
#[serial]
async fn shipped_order_is_not_cancellable() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Carrots", "5.00", 10)
        .await;

    let order_id = place_order(&app, &buyer, product, 2).await;

    let response = app
        .put(
            &format!("/orders/{}/status", order_id),
            Some(&producer),
            &json!({"status": "shipped"}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .post(&format!("/orders/{}/cancel", order_id), Some(&buyer), &json!({}))
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(app.stock_of(product).await, 8, "no stock restored");
}

#[tokio::test]
#[serial]
async fn delivery_stamps_timestamp_and_finalizes() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Carrots", "5.00", 10)
        .await;

    let order_id = place_order(&app, &buyer, product, 1).await;

    let response = app
        .put(
            &format!("/orders/{}/status", order_id),
            Some(&producer),
            &json!({"status": "delivered"}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "delivered");
    assert!(
        body["data"]["delivered_utc"].as_str().is_some(),
        "delivery timestamp stamped"
    );

    // Finalized: no further updates, no cancellation
    let response = app
        .put(
            &format!("/orders/{}/status", order_id),
            Some(&producer),
            &json!({"status": "confirmed"}),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .post(&format!("/orders/{}/cancel", order_id), Some(&buyer), &json!({}))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[serial]
async fn invalid_status_targets_are_rejected() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Carrots", "5.00", 10)
        .await;

    let order_id = place_order(&app, &buyer, product, 1).await;

    for target in ["pending", "cancelled", "lost-in-transit"] {
        let response = app
            .put(
                &format!("/orders/{}/status", order_id),
                Some(&producer),
                &json!({"status": target}),
            )
            .await;
        assert_eq!(response.status(), 400, "target '{target}' must be rejected");
    }
}

#[tokio::test]
#[serial]
async fn only_supplying_producers_update_status() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let other_producer = app
        .register_and_login("otherfarm@example.com", "producer")
        .await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Carrots", "5.00", 10)
        .await;

    let order_id = place_order(&app, &buyer, product, 1).await;

    // A producer with no line in the order is rejected
    let response = app
        .put(
            &format!("/orders/{}/status", order_id),
            Some(&other_producer),
            &json!({"status": "confirmed"}),
        )
        .await;
    assert_eq!(response.status(), 403);

    // Consumers cannot update status at all
    let response = app
        .put(
            &format!("/orders/{}/status", order_id),
            Some(&buyer),
            &json!({"status": "confirmed"}),
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[serial]
async fn buyers_only_see_their_own_orders() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    let stranger = app.register_and_login("stranger@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Carrots", "5.00", 10)
        .await;

    let order_id = place_order(&app, &buyer, product, 1).await;

    let response = app.get(&format!("/orders/{}", order_id), Some(&stranger)).await;
    assert_eq!(response.status(), 404);

    // The supplying producer can see it
    let response = app.get(&format!("/orders/{}", order_id), Some(&producer)).await;
    assert_eq!(response.status(), 200);

    // And listing is scoped to the buyer
    let response = app.get("/orders", Some(&buyer)).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total_items"], 1);

    let response = app.get("/orders", Some(&stranger)).await;
    let body: Value = response.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}
