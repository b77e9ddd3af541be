//! Delivery address model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Delivery address row. Orders copy these fields by value at creation,
/// so later edits never change order history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Address {
    pub address_id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub is_default: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating an address.
#[derive(Debug, Clone)]
pub struct CreateAddress {
    pub user_id: Uuid,
    pub label: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub is_default: bool,
}

/// Input for updating an address.
#[derive(Debug, Clone, Default)]
pub struct UpdateAddress {
    pub label: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}
