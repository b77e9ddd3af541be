//! Order model. Orders are immutable after creation apart from status
//! transitions; they are never physically deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "confirmed" => OrderStatus::Confirmed,
            "preparing" => OrderStatus::Preparing,
            "shipped" => OrderStatus::Shipped,
            "delivered" => OrderStatus::Delivered,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Pending,
        }
    }
}

/// Order row. The delivery_* columns are a by-value snapshot of the
/// buyer's address at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Order {
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub status: String,
    pub total_amount: Decimal,
    pub delivery_street: String,
    pub delivery_number: String,
    pub delivery_complement: Option<String>,
    pub delivery_district: String,
    pub delivery_city: String,
    pub delivery_state: String,
    pub delivery_postal_code: String,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub delivered_utc: Option<DateTime<Utc>>,
}

impl Order {
    pub fn status(&self) -> OrderStatus {
        OrderStatus::from_string(&self.status)
    }
}

/// Order line row. `unit_price` is the discounted catalog price captured
/// at the instant of order creation; never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OrderItem {
    pub order_item_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// Order line joined with live catalog display fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OrderItemDetail {
    pub order_item_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub category_name: String,
    pub producer_name: String,
    pub unit: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

/// Filter parameters for listing a buyer's orders.
#[derive(Debug, Clone, Default)]
pub struct ListOrdersFilter {
    pub status: Option<OrderStatus>,
    pub page: i64,
    pub page_size: i64,
}
