use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header, request::Parts},
    middleware::Next,
    response::IntoResponse,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{AppState, dtos::ErrorResponse, services::AccessTokenClaims};

/// Middleware to require authentication
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let token = match token {
        Some(token) => token,
        None => {
            return Err(unauthorized("Missing or invalid Authorization header"));
        }
    };

    let claims = match state.jwt.validate_access_token(token) {
        Ok(claims) => claims,
        Err(_) => {
            return Err(unauthorized("Invalid or expired token"));
        }
    };

    // Store claims in request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            success: false,
            message: message.to_string(),
            errors: None,
        }),
    )
}

/// Extractor to easily get claims in handlers
pub struct AuthUser(pub AccessTokenClaims);

impl AuthUser {
    /// The authenticated user's id.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.0.user_id().map_err(AppError::Unauthorized)
    }

    /// Reject non-producer accounts.
    pub fn require_producer(&self) -> Result<(), AppError> {
        if self.0.role == "producer" {
            Ok(())
        } else {
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Producer role required"
            )))
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<AccessTokenClaims>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                success: false,
                message: "Auth claims missing from request extensions".to_string(),
                errors: None,
            }),
        ))?;

        Ok(AuthUser(claims.clone()))
    }
}
