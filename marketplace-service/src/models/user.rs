//! User account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Consumer,
    Producer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Consumer => "consumer",
            UserRole::Producer => "producer",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "producer" => UserRole::Producer,
            _ => UserRole::Consumer,
        }
    }
}

/// User account row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> UserRole {
        UserRole::from_string(&self.role)
    }

    pub fn sanitized(&self) -> SanitizedUser {
        SanitizedUser {
            user_id: self.user_id,
            email: self.email.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
            role: self.role.clone(),
            created_utc: self.created_utc,
        }
    }
}

/// User view without credential material.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SanitizedUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

/// Input for updating a user profile.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub phone: Option<String>,
}
