use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAddressRequest {
    #[validate(length(min = 1, message = "Label is required"))]
    #[schema(example = "Home")]
    pub label: String,

    #[validate(length(min = 1, message = "Street is required"))]
    #[schema(example = "Rua das Laranjeiras")]
    pub street: String,

    #[validate(length(min = 1, message = "Number is required"))]
    #[schema(example = "142")]
    pub number: String,

    #[schema(example = "Apt 31")]
    pub complement: Option<String>,

    #[validate(length(min = 1, message = "District is required"))]
    #[schema(example = "Centro")]
    pub district: String,

    #[validate(length(min = 1, message = "City is required"))]
    #[schema(example = "Campinas")]
    pub city: String,

    #[validate(length(min = 2, max = 2, message = "State must be a 2-letter code"))]
    #[schema(example = "SP")]
    pub state: String,

    #[validate(length(min = 1, message = "Postal code is required"))]
    #[schema(example = "13015-001")]
    pub postal_code: String,

    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAddressRequest {
    pub label: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    #[validate(length(min = 2, max = 2, message = "State must be a 2-letter code"))]
    pub state: Option<String>,
    pub postal_code: Option<String>,
}
