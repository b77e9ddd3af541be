//! JWT issuance and validation for marketplace accounts.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fs;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT service for token generation and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// Claims for access tokens (short-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// Account role (consumer or producer)
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

impl AccessTokenClaims {
    /// The authenticated user's id. Tokens are only issued with UUID
    /// subjects, so a parse failure means a forged token.
    pub fn user_id(&self) -> Result<Uuid, anyhow::Error> {
        self.sub
            .parse()
            .map_err(|_| anyhow::anyhow!("Malformed subject claim"))
    }
}

/// Claims for refresh tokens (long-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Token ID (matches the stored refresh session)
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Token pair returned to the client
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl JwtService {
    /// Create a new JWT service by loading RSA keys from files
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let private_key_pem = fs::read_to_string(&config.private_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read private key from {}: {}",
                config.private_key_path,
                e
            )
        })?;

        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse private key: {}", e))?;

        let public_key_pem = fs::read_to_string(&config.public_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read public key from {}: {}",
                config.public_key_path,
                e
            )
        })?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse public key: {}", e))?;

        tracing::info!("JWT service initialized with RS256 keys");

        Ok(Self {
            encoding_key,
            decoding_key,
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        })
    }

    /// Generate an access token for a user
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: &str,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::RS256);
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    /// Generate a refresh token for a user. Returns the token and its jti,
    /// which keys the stored refresh session.
    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<(String, String), anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::days(self.refresh_token_expiry_days);
        let jti = Uuid::new_v4().to_string();

        let claims = RefreshTokenClaims {
            sub: user_id.to_string(),
            jti: jti.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let header = Header::new(Algorithm::RS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))?;

        Ok((token, jti))
    }

    /// Validate an access token and return its claims
    pub fn validate_access_token(
        &self,
        token: &str,
    ) -> Result<AccessTokenClaims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::RS256);
        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }

    /// Validate a refresh token and return its claims
    pub fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshTokenClaims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::RS256);
        decode::<RefreshTokenClaims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }

    /// Access-token lifetime in seconds, for token responses.
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }

    /// Refresh-token lifetime, for computing stored session expiry.
    pub fn refresh_token_expiry_days(&self) -> i64 {
        self.refresh_token_expiry_days
    }
}
