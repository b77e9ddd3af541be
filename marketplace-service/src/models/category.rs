//! Product category model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}
