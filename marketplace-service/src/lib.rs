pub mod config;
pub mod domain;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    Json, Router,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use service_core::middleware::{
    metrics::metrics_middleware, rate_limit::ip_rate_limit_middleware,
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use service_core::middleware::rate_limit::IpRateLimiter;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::MarketplaceConfig;
use crate::middleware::auth_middleware;
use crate::services::{AuthService, Database, JwtService, OrderService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: MarketplaceConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub auth: AuthService,
    pub orders: OrderService,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::users::get_me,
        handlers::users::update_me,
        handlers::addresses::list_addresses,
        handlers::addresses::create_address,
        handlers::addresses::update_address,
        handlers::addresses::delete_address,
        handlers::addresses::set_default_address,
        handlers::categories::list_categories,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::cart::get_cart,
        handlers::cart::add_cart_item,
        handlers::cart::update_cart_item,
        handlers::cart::remove_cart_item,
        handlers::orders::place_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::cancel_order,
        handlers::orders::update_order_status,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::Pagination,
            dtos::auth::RegisterRequest,
            dtos::auth::LoginRequest,
            dtos::auth::RefreshRequest,
            dtos::auth::UpdateProfileRequest,
            dtos::address::CreateAddressRequest,
            dtos::address::UpdateAddressRequest,
            dtos::product::CreateProductRequest,
            dtos::product::UpdateProductRequest,
            dtos::cart::AddCartItemRequest,
            dtos::cart::UpdateCartItemRequest,
            dtos::order::PlaceOrderRequest,
            dtos::order::UpdateOrderStatusRequest,
            services::TokenResponse,
            models::SanitizedUser,
            models::UserRole,
            models::Address,
            models::Category,
            models::Product,
            models::ProductDetail,
            models::Cart,
            models::CartItem,
            models::CartItemDetail,
            models::CartWithItems,
            models::Order,
            models::OrderItem,
            models::OrderItemDetail,
            models::OrderWithItems,
            models::OrderStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Account registration and token issuance"),
        (name = "Users", description = "Profile management"),
        (name = "Addresses", description = "Delivery addresses"),
        (name = "Catalog", description = "Categories and products"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Orders", description = "Order placement and lifecycle")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 503, description = "Database unavailable")
    ),
    tag = "Health"
)]
async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "marketplace-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "marketplace-service",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Readiness check endpoint for orchestrator probes.
async fn readiness_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = services::get_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        metrics,
    )
}

fn cors_layer(config: &MarketplaceConfig) -> CorsLayer {
    if config.security.allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<_> = config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<axum::http::HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route(
            "/auth/register",
            post(handlers::auth::register).route_layer(from_fn_with_state(
                state.register_rate_limiter.clone(),
                ip_rate_limit_middleware,
            )),
        )
        .route(
            "/auth/login",
            post(handlers::auth::login).route_layer(from_fn_with_state(
                state.login_rate_limiter.clone(),
                ip_rate_limit_middleware,
            )),
        )
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/categories", get(handlers::categories::list_categories))
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product));

    let protected = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/users/me",
            get(handlers::users::get_me).put(handlers::users::update_me),
        )
        .route(
            "/addresses",
            get(handlers::addresses::list_addresses).post(handlers::addresses::create_address),
        )
        .route(
            "/addresses/:id",
            put(handlers::addresses::update_address).delete(handlers::addresses::delete_address),
        )
        .route(
            "/addresses/:id/default",
            put(handlers::addresses::set_default_address),
        )
        .route("/products", post(handlers::products::create_product))
        .route(
            "/products/:id",
            put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route("/cart", get(handlers::cart::get_cart))
        .route("/cart/items", post(handlers::cart::add_cart_item))
        .route(
            "/cart/items/:id",
            put(handlers::cart::update_cart_item).delete(handlers::cart::remove_cart_item),
        )
        .route(
            "/orders",
            post(handlers::orders::place_order).get(handlers::orders::list_orders),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/cancel", post(handlers::orders::cancel_order))
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .merge(public)
        .merge(protected);

    if state.config.swagger.enabled {
        router = router.merge(
            SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .with_state(state)
}
