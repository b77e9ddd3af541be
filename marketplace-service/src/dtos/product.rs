use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Distinguishes an absent field (keep current value) from an explicit
/// null (clear the value).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    pub category_id: Uuid,

    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Organic carrots")]
    pub name: String,

    #[schema(example = "Freshly harvested, pesticide free")]
    pub description: Option<String>,

    #[validate(length(min = 1, message = "Unit is required"))]
    #[schema(example = "kg")]
    pub unit: String,

    /// List price; must be non-negative.
    #[schema(value_type = String, example = "7.50")]
    pub price: Decimal,

    /// Promotion discount in percent (0-100).
    #[schema(value_type = Option<String>, example = "15")]
    pub discount_percent: Option<Decimal>,

    #[serde(default)]
    pub promotion_active: bool,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    #[serde(default)]
    pub stock_quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    /// Present-and-null clears the discount; absent keeps it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub discount_percent: Option<Option<Decimal>>,
    pub promotion_active: Option<bool>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProductsQuery {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}
