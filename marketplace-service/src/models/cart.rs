//! Shopping cart model. Exactly one cart per buyer, created on first use.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Cart {
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CartItem {
    pub cart_item_id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_utc: DateTime<Utc>,
}

/// Cart line joined with the live product fields needed for display and
/// for order assembly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CartItemDetail {
    pub cart_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: String,
    pub quantity: i32,
    pub price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub promotion_active: bool,
    pub stock_quantity: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartWithItems {
    pub cart: Cart,
    pub items: Vec<CartItemDetail>,
}
