//! Account registration, login and refresh-token rotation.

use chrono::{Duration, Utc};
use service_core::error::AppError;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::dtos::auth::{LoginRequest, RegisterRequest};
use crate::models::{CreateUser, SanitizedUser, UserRole};
use crate::services::database::Database;
use crate::services::jwt::{JwtService, TokenResponse};
use crate::utils::password::{Password, hash_password, verify_password};

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(db: Database, jwt: JwtService) -> Self {
        Self { db, jwt }
    }

    /// Register a new account.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<SanitizedUser, AppError> {
        let password_hash = hash_password(&Password::new(req.password))?;

        let user = self
            .db
            .create_user(&CreateUser {
                email: req.email.to_lowercase(),
                password_hash,
                name: req.name,
                phone: req.phone,
                role: UserRole::from_string(&req.role),
            })
            .await?;

        info!(user_id = %user.user_id, "Account registered");

        Ok(user.sanitized())
    }

    /// Login with email and password, issuing an access/refresh pair.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse, AppError> {
        let user = self
            .db
            .get_user_by_email(&req.email.to_lowercase())
            .await?
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Invalid credentials")))?;

        verify_password(&Password::new(req.password), &user.password_hash)
            .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid credentials")))?;

        if !user.is_active {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Account is deactivated"
            )));
        }

        self.issue_tokens(user.user_id, &user.email, &user.role).await
    }

    /// Rotate tokens: the presented refresh token is consumed (single
    /// use) and a fresh pair is issued.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        // Signature/expiry check before touching storage.
        self.jwt
            .validate_refresh_token(refresh_token)
            .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid or expired refresh token")))?;

        let user_id = self
            .db
            .consume_refresh_session(&digest(refresh_token))
            .await?
            .ok_or_else(|| {
                AppError::AuthError(anyhow::anyhow!("Refresh token revoked or unknown"))
            })?;

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Account no longer exists")))?;

        if !user.is_active {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Account is deactivated"
            )));
        }

        self.issue_tokens(user.user_id, &user.email, &user.role).await
    }

    /// Logout: revoke every live refresh session for the user. Access
    /// tokens simply run out their short expiry.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        let revoked = self.db.revoke_refresh_sessions(user_id).await?;
        info!(revoked = revoked, "Refresh sessions revoked");
        Ok(())
    }

    async fn issue_tokens(
        &self,
        user_id: Uuid,
        email: &str,
        role: &str,
    ) -> Result<TokenResponse, AppError> {
        let access_token = self
            .jwt
            .generate_access_token(user_id, email, role)
            .map_err(AppError::InternalError)?;
        let (refresh_token, _jti) = self
            .jwt
            .generate_refresh_token(user_id)
            .map_err(AppError::InternalError)?;

        let expires_utc = Utc::now() + Duration::days(self.jwt.refresh_token_expiry_days());
        self.db
            .create_refresh_session(user_id, &digest(&refresh_token), expires_utc)
            .await?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }
}

/// Hex SHA-256 digest; refresh tokens are never stored in the clear.
fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
