use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::dtos::ErrorResponse;

/// JSON extractor that runs `validator` rules before the handler sees the
/// payload. Rejections use the response envelope like every other error.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            let body = ErrorResponse {
                success: false,
                message: format!("Json parse error: {}", e),
                errors: None,
            };
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        })?;

        value.validate().map_err(|e| {
            let details = e
                .field_errors()
                .into_iter()
                .flat_map(|(field, errs)| {
                    errs.iter().map(move |err| {
                        let msg = err
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| err.code.to_string());
                        format!("{}: {}", field, msg)
                    })
                })
                .collect::<Vec<_>>();
            let body = ErrorResponse {
                success: false,
                message: "Validation error".to_string(),
                errors: Some(details),
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        })?;

        Ok(ValidatedJson(value))
    }
}
