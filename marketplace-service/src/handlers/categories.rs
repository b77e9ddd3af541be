use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use service_core::error::AppError;

use crate::{AppState, dtos::ApiResponse};

/// List product categories
#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "Categories", body = [Category])
    ),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let categories = state.db.list_categories().await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(categories))))
}
