//! Product catalog model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Product row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub product_id: Uuid,
    pub producer_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub promotion_active: bool,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Product row joined with category and producer display fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProductDetail {
    pub product_id: Uuid,
    pub producer_id: Uuid,
    pub producer_name: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub promotion_active: bool,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub producer_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub promotion_active: bool,
    pub stock_quantity: i32,
}

/// Input for updating a product (ownership checked by the caller).
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price: Option<Decimal>,
    pub discount_percent: Option<Option<Decimal>>,
    pub promotion_active: Option<bool>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

/// Filter parameters for listing products.
#[derive(Debug, Clone, Default)]
pub struct ListProductsFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: i64,
    pub page_size: i64,
}
