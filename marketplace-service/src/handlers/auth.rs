use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use service_core::error::AppError;

use crate::{
    AppState,
    dtos::{
        ApiResponse,
        auth::{LoginRequest, RefreshRequest, RegisterRequest},
    },
    middleware::AuthUser,
    utils::ValidatedJson,
};

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = SanitizedUser),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(user, "Account created")),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account deactivated", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth.login(req).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(tokens, "Login successful")),
    ))
}

/// Rotate an access/refresh token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed", body = TokenResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth.refresh(&req.refresh_token).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(tokens, "Token refreshed")),
    ))
}

/// Logout, revoking the account's refresh sessions
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Invalid token", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout(user.user_id()?).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message((), "Logged out successfully")),
    ))
}
