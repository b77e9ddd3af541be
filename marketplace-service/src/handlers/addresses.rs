use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    AppState,
    dtos::{
        ApiResponse,
        address::{CreateAddressRequest, UpdateAddressRequest},
    },
    middleware::AuthUser,
    models::{CreateAddress, UpdateAddress},
    utils::ValidatedJson,
};

/// List the authenticated user's addresses
#[utoipa::path(
    get,
    path = "/addresses",
    responses(
        (status = 200, description = "Addresses", body = [Address]),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Addresses",
    security(("bearer_auth" = []))
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let addresses = state.db.list_addresses(user.user_id()?).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(addresses))))
}

/// Create an address
#[utoipa::path(
    post,
    path = "/addresses",
    request_body = CreateAddressRequest,
    responses(
        (status = 201, description = "Address created", body = Address),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Addresses",
    security(("bearer_auth" = []))
)]
pub async fn create_address(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateAddressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = CreateAddress {
        user_id: user.user_id()?,
        label: req.label,
        street: req.street,
        number: req.number,
        complement: req.complement,
        district: req.district,
        city: req.city,
        state: req.state,
        postal_code: req.postal_code,
        is_default: req.is_default,
    };
    let address = state.db.create_address(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(address, "Address created")),
    ))
}

/// Update an address
#[utoipa::path(
    put,
    path = "/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    request_body = UpdateAddressRequest,
    responses(
        (status = 200, description = "Address updated", body = Address),
        (status = 404, description = "Address not found", body = ErrorResponse)
    ),
    tag = "Addresses",
    security(("bearer_auth" = []))
)]
pub async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(address_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateAddressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = UpdateAddress {
        label: req.label,
        street: req.street,
        number: req.number,
        complement: req.complement,
        district: req.district,
        city: req.city,
        state: req.state,
        postal_code: req.postal_code,
    };
    let address = state
        .db
        .update_address(address_id, user.user_id()?, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Address not found")))?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(address, "Address updated")),
    ))
}

/// Delete an address
#[utoipa::path(
    delete,
    path = "/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 200, description = "Address deleted"),
        (status = 404, description = "Address not found", body = ErrorResponse)
    ),
    tag = "Addresses",
    security(("bearer_auth" = []))
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(address_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state.db.delete_address(address_id, user.user_id()?).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Address not found")));
    }
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message((), "Address deleted")),
    ))
}

/// Mark an address as the default delivery address
#[utoipa::path(
    put,
    path = "/addresses/{id}/default",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 200, description = "Default address set", body = Address),
        (status = 404, description = "Address not found", body = ErrorResponse)
    ),
    tag = "Addresses",
    security(("bearer_auth" = []))
)]
pub async fn set_default_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(address_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let address = state
        .db
        .set_default_address(address_id, user.user_id()?)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Address not found")))?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(address, "Default address set")),
    ))
}
