use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    AppState,
    dtos::{
        ApiResponse, Pagination,
        product::{CreateProductRequest, ListProductsQuery, UpdateProductRequest},
    },
    middleware::AuthUser,
    models::{CreateProduct, ListProductsFilter, UpdateProduct},
    utils::ValidatedJson,
};

const DEFAULT_PAGE_SIZE: i64 = 20;

fn check_price(price: Decimal) -> Result<(), AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Price cannot be negative"
        )));
    }
    Ok(())
}

fn check_discount(discount: Option<Decimal>) -> Result<(), AppError> {
    if let Some(d) = discount {
        if d < Decimal::ZERO || d > Decimal::ONE_HUNDRED {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Discount must be between 0 and 100"
            )));
        }
    }
    Ok(())
}

/// Browse the active-product catalog
#[utoipa::path(
    get,
    path = "/products",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Products", body = [ProductDetail])
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ListProductsFilter {
        category_id: query.category_id,
        search: query.search,
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };
    let (products, total) = state.db.list_products(&filter).await?;
    let pagination = Pagination::new(filter.page, filter.page_size, total);
    Ok((
        StatusCode::OK,
        Json(ApiResponse::paginated(products, "OK", pagination)),
    ))
}

/// Get a product with category and producer details
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ProductDetail),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = state
        .db
        .get_product_detail(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(product))))
}

/// Create a product (producer only)
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 403, description = "Producer role required", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Catalog",
    security(("bearer_auth" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_producer()?;
    check_price(req.price)?;
    check_discount(req.discount_percent)?;

    let input = CreateProduct {
        producer_id: user.user_id()?,
        category_id: req.category_id,
        name: req.name,
        description: req.description,
        unit: req.unit,
        price: req.price,
        discount_percent: req.discount_percent,
        promotion_active: req.promotion_active,
        stock_quantity: req.stock_quantity,
    };
    let product = state.db.create_product(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(product, "Product created")),
    ))
}

/// Update a product (owning producer only)
#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    tag = "Catalog",
    security(("bearer_auth" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_producer()?;
    if let Some(price) = req.price {
        check_price(price)?;
    }
    if let Some(discount) = &req.discount_percent {
        check_discount(*discount)?;
    }

    let input = UpdateProduct {
        category_id: req.category_id,
        name: req.name,
        description: req.description,
        unit: req.unit,
        price: req.price,
        discount_percent: req.discount_percent,
        promotion_active: req.promotion_active,
        stock_quantity: req.stock_quantity,
        is_active: req.is_active,
    };
    let product = state
        .db
        .update_product(product_id, user.user_id()?, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(product, "Product updated")),
    ))
}

/// Deactivate a product (owning producer only)
#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deactivated"),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    tag = "Catalog",
    security(("bearer_auth" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    user.require_producer()?;
    let deactivated = state
        .db
        .deactivate_product(product_id, user.user_id()?)
        .await?;
    if !deactivated {
        return Err(AppError::NotFound(anyhow::anyhow!("Product not found")));
    }
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message((), "Product deactivated")),
    ))
}
