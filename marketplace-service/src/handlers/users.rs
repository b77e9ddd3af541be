use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use service_core::error::AppError;

use crate::{
    AppState,
    dtos::{ApiResponse, auth::UpdateProfileRequest},
    middleware::AuthUser,
    models::UpdateUser,
    utils::ValidatedJson,
};

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Profile", body = SanitizedUser),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .db
        .get_user(user.user_id()?)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(profile.sanitized()))))
}

/// Update the authenticated user's profile
#[utoipa::path(
    put,
    path = "/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = SanitizedUser),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = UpdateUser {
        name: req.name,
        phone: req.phone,
    };
    let profile = state
        .db
        .update_user(user.user_id()?, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(
            profile.sanitized(),
            "Profile updated",
        )),
    ))
}
