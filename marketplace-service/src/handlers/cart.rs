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
        cart::{AddCartItemRequest, UpdateCartItemRequest},
    },
    middleware::AuthUser,
    utils::ValidatedJson,
};

/// Get the authenticated user's cart
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Cart with items", body = CartWithItems),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Cart",
    security(("bearer_auth" = []))
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.db.get_cart_with_items(user.user_id()?).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(cart))))
}

/// Add a product to the cart; repeated adds accumulate quantity
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddCartItemRequest,
    responses(
        (status = 201, description = "Item added", body = CartItem),
        (status = 400, description = "Product unavailable", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    tag = "Cart",
    security(("bearer_auth" = []))
)]
pub async fn add_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<AddCartItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = state
        .db
        .get_product(req.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))?;
    if !product.is_active {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Product '{}' is unavailable",
            product.name
        )));
    }

    let cart = state.db.get_or_create_cart(user.user_id()?).await?;
    let item = state
        .db
        .add_cart_item(cart.cart_id, req.product_id, req.quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(item, "Item added to cart")),
    ))
}

/// Replace a cart line's quantity
#[utoipa::path(
    put,
    path = "/cart/items/{id}",
    params(("id" = Uuid, Path, description = "Cart item id")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Item updated", body = CartItem),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    tag = "Cart",
    security(("bearer_auth" = []))
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(cart_item_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCartItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.db.get_or_create_cart(user.user_id()?).await?;
    let item = state
        .db
        .update_cart_item(cart.cart_id, cart_item_id, req.quantity)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Cart item not found")))?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(item, "Cart item updated")),
    ))
}

/// Remove a cart line
#[utoipa::path(
    delete,
    path = "/cart/items/{id}",
    params(("id" = Uuid, Path, description = "Cart item id")),
    responses(
        (status = 200, description = "Item removed"),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    tag = "Cart",
    security(("bearer_auth" = []))
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(cart_item_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.db.get_or_create_cart(user.user_id()?).await?;
    let removed = state.db.remove_cart_item(cart.cart_id, cart_item_id).await?;
    if !removed {
        return Err(AppError::NotFound(anyhow::anyhow!("Cart item not found")));
    }
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message((), "Cart item removed")),
    ))
}
