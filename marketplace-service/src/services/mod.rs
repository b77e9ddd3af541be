pub mod auth;
pub mod database;
pub mod jwt;
pub mod metrics;
pub mod orders;

pub use auth::AuthService;
pub use database::Database;
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims, TokenResponse};
pub use metrics::{get_metrics, init_metrics};
pub use orders::OrderService;
