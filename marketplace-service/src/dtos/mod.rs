//! Request/response DTOs and the uniform response envelope.

pub mod address;
pub mod auth;
pub mod cart;
pub mod order;
pub mod product;

use serde::Serialize;
use utoipa::ToSchema;

/// Error body shape (also produced by `AppError` in service-core).
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

/// Pagination block for list endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, page_size: i64, total_items: i64) -> Self {
        let page_size = page_size.max(1);
        Self {
            page: page.max(1),
            page_size,
            total_items,
            total_pages: (total_items + page_size - 1) / page_size,
        }
    }
}

/// Uniform success envelope: `{success, message, data, pagination?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::with_message(data, "OK")
    }

    pub fn with_message(data: T, message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data,
            pagination: None,
        }
    }

    pub fn paginated(data: T, message: &str, pagination: Pagination) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data,
            pagination: Some(pagination),
        }
    }
}
