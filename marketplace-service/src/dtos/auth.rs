use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

fn validate_role(role: &str) -> Result<(), ValidationError> {
    match role {
        "consumer" | "producer" => Ok(()),
        _ => Err(ValidationError::new("invalid_role")),
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "maria@sitioboaterra.com.br")]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "password123", min_length = 8)]
    pub password: String,

    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Maria Souza")]
    pub name: String,

    #[schema(example = "+55 11 98765-4321")]
    pub phone: Option<String>,

    #[validate(custom(function = "validate_role", message = "Role must be consumer or producer"))]
    #[serde(default = "default_role")]
    #[schema(example = "consumer")]
    pub role: String,
}

fn default_role() -> String {
    "consumer".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "maria@sitioboaterra.com.br")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[schema(example = "refresh-token-123")]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub phone: Option<String>,
}
