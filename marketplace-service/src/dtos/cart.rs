use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[schema(example = 2, minimum = 1)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[schema(example = 3, minimum = 1)]
    pub quantity: i32,
}
