//! Typed errors for the order domain.

use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Product '{name}' is unavailable")]
    ProductUnavailable { name: String },

    #[error("Insufficient stock for '{name}': {available} available")]
    InsufficientStock { name: String, available: i32 },

    #[error("Address not found")]
    AddressNotFound,

    #[error("No delivery address configured")]
    NoDeliveryAddress,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Order in status '{status}' cannot be cancelled")]
    NotCancellable { status: String },

    #[error("Order in status '{status}' is already finalized")]
    AlreadyFinalized { status: String },

    #[error("Invalid order status '{value}'")]
    InvalidStatus { value: String },

    /// Infrastructure-level failure (lock timeout, connection loss). The
    /// transaction has been rolled back; details are logged, not exposed.
    #[error("Transaction failed")]
    Transaction(#[from] sqlx::Error),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyCart
            | OrderError::ProductUnavailable { .. }
            | OrderError::InsufficientStock { .. }
            | OrderError::NoDeliveryAddress
            | OrderError::NotCancellable { .. }
            | OrderError::AlreadyFinalized { .. }
            | OrderError::InvalidStatus { .. } => {
                AppError::BadRequest(anyhow::anyhow!(err.to_string()))
            }
            OrderError::AddressNotFound | OrderError::OrderNotFound => {
                AppError::NotFound(anyhow::anyhow!(err.to_string()))
            }
            OrderError::Transaction(e) => {
                tracing::error!(error = %e, "Order transaction failed");
                AppError::DatabaseError(anyhow::Error::new(e))
            }
        }
    }
}
