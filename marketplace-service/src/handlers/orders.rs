use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    AppState,
    dtos::{
        ApiResponse, Pagination,
        order::{ListOrdersQuery, PlaceOrderRequest, UpdateOrderStatusRequest},
    },
    middleware::AuthUser,
    models::{ListOrdersFilter, OrderStatus},
    utils::ValidatedJson,
};

const DEFAULT_PAGE_SIZE: i64 = 20;

/// Place an order from the cart
///
/// Converts the cart into an immutable order in one atomic transaction:
/// prices and the delivery address are captured as of this moment, stock
/// is decremented, and the cart is emptied. Any failure leaves no trace.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderWithItems),
        (status = 400, description = "Empty cart, unavailable product or insufficient stock", body = ErrorResponse),
        (status = 404, description = "Address not found", body = ErrorResponse)
    ),
    tag = "Orders",
    security(("bearer_auth" = []))
)]
pub async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<PlaceOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = state
        .orders
        .place_order(user.user_id()?, req.address_id, req.notes)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(order, "Order placed")),
    ))
}

/// List the authenticated buyer's orders
#[utoipa::path(
    get,
    path = "/orders",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Orders", body = [Order])
    ),
    tag = "Orders",
    security(("bearer_auth" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ListOrdersFilter {
        status: query.status.as_deref().map(OrderStatus::from_string),
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };
    let (orders, total) = state.orders.list_orders(user.user_id()?, &filter).await?;
    let pagination = Pagination::new(filter.page, filter.page_size, total);
    Ok((
        StatusCode::OK,
        Json(ApiResponse::paginated(orders, "OK", pagination)),
    ))
}

/// Get an order with its lines
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = OrderWithItems),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    tag = "Orders",
    security(("bearer_auth" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.get_order(order_id, user.user_id()?).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(order))))
}

/// Cancel an order, restoring stock
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled", body = Order),
        (status = 400, description = "Order can no longer be cancelled", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    tag = "Orders",
    security(("bearer_auth" = []))
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.cancel_order(order_id, user.user_id()?).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(order, "Order cancelled")),
    ))
}

/// Progress an order's status (producer only)
#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Order),
        (status = 400, description = "Invalid target status or finalized order", body = ErrorResponse),
        (status = 403, description = "Not a supplier of this order", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    tag = "Orders",
    security(("bearer_auth" = []))
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_producer()?;
    let order = state
        .orders
        .update_status(order_id, user.user_id()?, &req.status)
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(order, "Order status updated")),
    ))
}
