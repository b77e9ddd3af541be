//! Order placement tests: totals, snapshotting, atomicity and stock
//! consistency.

mod common;

use common::{TestApp, money};
use serde_json::{Value, json};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn order_total_sums_line_subtotals() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let category = app.seed_category("Vegetables").await;
    let carrots = app
        .create_product(&producer, category, "Carrots", "5.00", 50)
        .await;
    let honey = app
        .create_product(&producer, category, "Honey", "3.50", 20)
        .await;

    app.add_to_cart(&buyer, carrots, 2).await;
    app.add_to_cart(&buyer, honey, 1).await;

    let response = app.post("/orders", Some(&buyer), &json!({})).await;
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.unwrap();
    let order = &body["data"]["order"];
    let items = body["data"]["items"].as_array().unwrap();

    assert_eq!(order["status"], "pending");
    assert_eq!(money(&order["total_amount"]).to_string(), "13.50");
    assert_eq!(items.len(), 2);
    assert_eq!(money(&items[0]["subtotal"]).to_string(), "10.00");
    assert_eq!(money(&items[1]["subtotal"]).to_string(), "3.50");

    // Stock was decremented and the cart emptied
    assert_eq!(app.stock_of(carrots).await, 48);
    assert_eq!(app.stock_of(honey).await, 19);

    let response = app.get("/cart", Some(&buyer)).await;
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn unit_price_snapshots_active_discount() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let category = app.seed_category("Fruit").await;
    let response = app
        .post(
            "/products",
            Some(&producer),
            &json!({
                "category_id": category,
                "name": "Strawberries",
                "unit": "box",
                "price": "10.00",
                "discount_percent": "20",
                "promotion_active": true,
                "stock_quantity": 30
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let product: uuid::Uuid = body["data"]["product_id"].as_str().unwrap().parse().unwrap();

    app.add_to_cart(&buyer, product, 1).await;
    let response = app.post("/orders", Some(&buyer), &json!({})).await;
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.unwrap();
    let order_id = body["data"]["order"]["order_id"].as_str().unwrap().to_string();
    assert_eq!(money(&body["data"]["items"][0]["unit_price"]).to_string(), "8.00");

    // A later price change does not rewrite history
    let response = app
        .put(
            &format!("/products/{}", product),
            Some(&producer),
            &json!({"price": "99.00"}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app.get(&format!("/orders/{}", order_id), Some(&buyer)).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(money(&body["data"]["items"][0]["unit_price"]).to_string(), "8.00");
    assert_eq!(money(&body["data"]["order"]["total_amount"]).to_string(), "8.00");
}

#[tokio::test]
#[serial]
async fn empty_cart_is_rejected_without_side_effects() {
    let app = TestApp::spawn().await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let response = app.post("/orders", Some(&buyer), &json!({})).await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Cart is empty");
    assert_eq!(app.order_count("buyer@example.com").await, 0);
}

#[tokio::test]
#[serial]
async fn insufficient_stock_aborts_whole_order()  {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    app.create_address(&buyer, true).await;

    let category = app.seed_category("Vegetables").await;
    let carrots = app
        .create_product(&producer, category, "Carrots", "5.00", 50)
        .await;
    let kale = app
        .create_product(&producer, category, "Kale", "2.00", 3)
        .await;

    app.add_to_cart(&buyer, carrots, 2).await;
    app.add_to_cart(&buyer, kale, 10).await;

    let response = app.post("/orders", Some(&buyer), &json!({})).await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert!(
        body["message"].as_str().unwrap().contains("Kale"),
        "error names the product: {body}"
    );

    // Nothing moved: no order, no partial decrement, cart intact
    assert_eq!(app.order_count("buyer@example.com").await, 0);
    assert_eq!(app.stock_of(carrots).await, 50);
    assert_eq!(app.stock_of(kale).await, 3);

    let cart: Value = app.get("/cart", Some(&buyer)).await.json().await.unwrap();
    assert_eq!(cart["data"]["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn delivery_address_is_copied_by_value() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;
    let address = app.create_address(&buyer, true).await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Carrots", "5.00", 50)
        .await;
    app.add_to_cart(&buyer, product, 1).await;

    let response = app.post("/orders", Some(&buyer), &json!({})).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let order_id = body["data"]["order"]["order_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["order"]["delivery_city"], "Campinas");

    // Editing the address later must not change the order snapshot
    let response = app
        .put(
            &format!("/addresses/{}", address),
            Some(&buyer),
            &json!({"city": "Valinhos"}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app.get(&format!("/orders/{}", order_id), Some(&buyer)).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["order"]["delivery_city"], "Campinas");
}

#[tokio::test]
#[serial]
async fn missing_addresses_are_reported() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;
    let buyer = app.register_and_login("buyer@example.com", "consumer").await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Carrots", "5.00", 50)
        .await;
    app.add_to_cart(&buyer, product, 1).await;

    // No default address configured
    let response = app.post("/orders", Some(&buyer), &json!({})).await;
    assert_eq!(response.status(), 400);

    // Explicit address that does not belong to the buyer
    let other = app.register_and_login("other@example.com", "consumer").await;
    let other_address = app.create_address(&other, true).await;

    let response = app
        .post("/orders", Some(&buyer), &json!({"address_id": other_address}))
        .await;
    assert_eq!(response.status(), 404);

    assert_eq!(app.stock_of(product).await, 50);
}

#[tokio::test]
#[serial]
async fn concurrent_orders_never_oversell() {
    let app = TestApp::spawn().await;
    let producer = app.register_and_login("farm@example.com", "producer").await;

    let category = app.seed_category("Vegetables").await;
    let product = app
        .create_product(&producer, category, "Pumpkins", "8.00", 5)
        .await;

    let mut buyers = Vec::new();
    for i in 0..2 {
        let email = format!("race{}@example.com", i);
        let token = app.register_and_login(&email, "consumer").await;
        app.create_address(&token, true).await;
        app.add_to_cart(&token, product, 3).await;
        buyers.push(token);
    }

    // Both want 3 of 5: only one placement can succeed.
    let empty_body = json!({});
    let (first, second) = tokio::join!(
        app.post("/orders", Some(&buyers[0]), &empty_body),
        app.post("/orders", Some(&buyers[1]), &empty_body),
    );

    let statuses = [first.status().as_u16(), second.status().as_u16()];
    let successes = statuses.iter().filter(|s| **s == 201).count();
    let failures = statuses.iter().filter(|s| **s == 400).count();
    assert_eq!(successes, 1, "exactly one order placed: {statuses:?}");
    assert_eq!(failures, 1, "the loser fails on stock: {statuses:?}");

    // Total decrement never exceeds stock, never negative
    assert_eq!(app.stock_of(product).await, 2);
}
