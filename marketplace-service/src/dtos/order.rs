use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderRequest {
    /// Delivery address; the buyer's default address is used when absent.
    pub address_id: Option<Uuid>,

    #[validate(length(max = 500, message = "Notes are limited to 500 characters"))]
    #[schema(example = "Leave with the doorman")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of: confirmed, preparing, shipped, delivered.
    #[validate(length(min = 1, message = "Status is required"))]
    #[schema(example = "confirmed")]
    pub status: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListOrdersQuery {
    /// Filter by status.
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}
