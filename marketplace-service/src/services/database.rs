//! Database service for the marketplace: connection pool plus the query
//! surface for accounts, addresses, catalog and carts. Order placement and
//! lifecycle queries live in [`super::orders`] because they share one
//! transaction.

use crate::models::{
    Address, Cart, CartItem, CartItemDetail, CartWithItems, Category, CreateAddress,
    CreateProduct, CreateUser, ListProductsFilter, Product, ProductDetail, UpdateAddress,
    UpdateProduct, UpdateUser, User,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "marketplace-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by the test harness).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // User Operations
    // -------------------------------------------------------------------------

    /// Create a new user account.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(&self, input: &CreateUser) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user_id = Uuid::new_v4();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, email, password_hash, name, phone, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING user_id, email, password_hash, name, phone, role, is_active, created_utc, updated_utc
            "#,
        )
        .bind(user_id)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(input.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        timer.observe_duration();

        info!(user_id = %user.user_id, role = %user.role, "User created");

        Ok(user)
    }

    /// Get a user by id.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, name, phone, role, is_active, created_utc, updated_utc
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    /// Get a user by email (login path).
    #[instrument(skip(self, email))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user_by_email"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, name, phone, role, is_active, created_utc, updated_utc
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    /// Update a user's profile fields.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        input: &UpdateUser,
    ) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                updated_utc = NOW()
            WHERE user_id = $1
            RETURNING user_id, email, password_hash, name, phone, role, is_active, created_utc, updated_utc
            "#,
        )
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    // -------------------------------------------------------------------------
    // Refresh Session Operations
    // -------------------------------------------------------------------------

    /// Store a refresh session keyed by the token digest.
    #[instrument(skip(self, token_hash), fields(user_id = %user_id))]
    pub async fn create_refresh_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_utc: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_refresh_session"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO refresh_sessions (session_id, user_id, token_hash, expires_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to store refresh session: {}", e))
        })?;

        timer.observe_duration();

        Ok(())
    }

    /// Atomically consume a refresh session: marks it revoked and reports
    /// whether it was live (unrevoked, unexpired) at that moment. Rotation
    /// depends on this being a single statement.
    #[instrument(skip(self, token_hash))]
    pub async fn consume_refresh_session(&self, token_hash: &str) -> Result<Option<Uuid>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["consume_refresh_session"])
            .start_timer();

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE refresh_sessions
            SET revoked = TRUE
            WHERE token_hash = $1 AND revoked = FALSE AND expires_utc > NOW()
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to consume refresh session: {}", e))
        })?;

        timer.observe_duration();

        Ok(user_id)
    }

    /// Revoke all refresh sessions for a user (logout).
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn revoke_refresh_sessions(&self, user_id: Uuid) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["revoke_refresh_sessions"])
            .start_timer();

        let result = sqlx::query(
            "UPDATE refresh_sessions SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to revoke sessions: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // Address Operations
    // -------------------------------------------------------------------------

    /// Create an address. Setting it as default clears any previous
    /// default in the same transaction.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn create_address(&self, input: &CreateAddress) -> Result<Address, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_address"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        if input.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
                .bind(input.user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to clear default: {}", e))
                })?;
        }

        let address = sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses (address_id, user_id, label, street, number, complement,
                district, city, state, postal_code, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING address_id, user_id, label, street, number, complement, district, city,
                state, postal_code, is_default, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.label)
        .bind(&input.street)
        .bind(&input.number)
        .bind(&input.complement)
        .bind(&input.district)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.postal_code)
        .bind(input.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create address: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(address_id = %address.address_id, "Address created");

        Ok(address)
    }

    /// Get an address by id, scoped to its owner.
    #[instrument(skip(self), fields(address_id = %address_id, user_id = %user_id))]
    pub async fn get_address(
        &self,
        address_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Address>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_address"])
            .start_timer();

        let address = sqlx::query_as::<_, Address>(
            r#"
            SELECT address_id, user_id, label, street, number, complement, district, city,
                state, postal_code, is_default, created_utc, updated_utc
            FROM addresses
            WHERE address_id = $1 AND user_id = $2
            "#,
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get address: {}", e)))?;

        timer.observe_duration();

        Ok(address)
    }

    /// List a user's addresses, default first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_addresses"])
            .start_timer();

        let addresses = sqlx::query_as::<_, Address>(
            r#"
            SELECT address_id, user_id, label, street, number, complement, district, city,
                state, postal_code, is_default, created_utc, updated_utc
            FROM addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, created_utc
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list addresses: {}", e)))?;

        timer.observe_duration();

        Ok(addresses)
    }

    /// Update an address, scoped to its owner.
    #[instrument(skip(self, input), fields(address_id = %address_id, user_id = %user_id))]
    pub async fn update_address(
        &self,
        address_id: Uuid,
        user_id: Uuid,
        input: &UpdateAddress,
    ) -> Result<Option<Address>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_address"])
            .start_timer();

        let address = sqlx::query_as::<_, Address>(
            r#"
            UPDATE addresses
            SET label = COALESCE($3, label),
                street = COALESCE($4, street),
                number = COALESCE($5, number),
                complement = COALESCE($6, complement),
                district = COALESCE($7, district),
                city = COALESCE($8, city),
                state = COALESCE($9, state),
                postal_code = COALESCE($10, postal_code),
                updated_utc = NOW()
            WHERE address_id = $1 AND user_id = $2
            RETURNING address_id, user_id, label, street, number, complement, district, city,
                state, postal_code, is_default, created_utc, updated_utc
            "#,
        )
        .bind(address_id)
        .bind(user_id)
        .bind(&input.label)
        .bind(&input.street)
        .bind(&input.number)
        .bind(&input.complement)
        .bind(&input.district)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.postal_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update address: {}", e)))?;

        timer.observe_duration();

        Ok(address)
    }

    /// Delete an address, scoped to its owner.
    #[instrument(skip(self), fields(address_id = %address_id, user_id = %user_id))]
    pub async fn delete_address(&self, address_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_address"])
            .start_timer();

        let result = sqlx::query("DELETE FROM addresses WHERE address_id = $1 AND user_id = $2")
            .bind(address_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete address: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    /// Mark an address as the user's default, clearing the previous one.
    #[instrument(skip(self), fields(address_id = %address_id, user_id = %user_id))]
    pub async fn set_default_address(
        &self,
        address_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Address>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_default_address"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to clear default: {}", e))
            })?;

        let address = sqlx::query_as::<_, Address>(
            r#"
            UPDATE addresses
            SET is_default = TRUE, updated_utc = NOW()
            WHERE address_id = $1 AND user_id = $2
            RETURNING address_id, user_id, label, street, number, complement, district, city,
                state, postal_code, is_default, created_utc, updated_utc
            "#,
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to set default address: {}", e))
        })?;

        // No such address for this user: leave previous defaults untouched.
        if address.is_none() {
            tx.rollback().await.ok();
            timer.observe_duration();
            return Ok(None);
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        Ok(address)
    }

    // -------------------------------------------------------------------------
    // Category Operations
    // -------------------------------------------------------------------------

    /// List all categories.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_categories"])
            .start_timer();

        let categories = sqlx::query_as::<_, Category>(
            "SELECT category_id, name, description, created_utc FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list categories: {}", e))
        })?;

        timer.observe_duration();

        Ok(categories)
    }

    /// Get a category by id.
    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_category"])
            .start_timer();

        let category = sqlx::query_as::<_, Category>(
            "SELECT category_id, name, description, created_utc FROM categories WHERE category_id = $1",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get category: {}", e)))?;

        timer.observe_duration();

        Ok(category)
    }

    // -------------------------------------------------------------------------
    // Product Operations
    // -------------------------------------------------------------------------

    /// Create a product for a producer.
    #[instrument(skip(self, input), fields(producer_id = %input.producer_id))]
    pub async fn create_product(&self, input: &CreateProduct) -> Result<Product, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (product_id, producer_id, category_id, name, description, unit,
                price, discount_percent, promotion_active, stock_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING product_id, producer_id, category_id, name, description, unit, price,
                discount_percent, promotion_active, stock_quantity, is_active, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.producer_id)
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.unit)
        .bind(input.price)
        .bind(input.discount_percent)
        .bind(input.promotion_active)
        .bind(input.stock_quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Unknown category"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create product: {}", e)),
        })?;

        timer.observe_duration();

        info!(product_id = %product.product_id, name = %product.name, "Product created");

        Ok(product)
    }

    /// Get a product row by id.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, producer_id, category_id, name, description, unit, price,
                discount_percent, promotion_active, stock_quantity, is_active, created_utc, updated_utc
            FROM products
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get product: {}", e)))?;

        timer.observe_duration();

        Ok(product)
    }

    /// Get a product joined with category and producer display fields.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product_detail(
        &self,
        product_id: Uuid,
    ) -> Result<Option<ProductDetail>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_product_detail"])
            .start_timer();

        let product = sqlx::query_as::<_, ProductDetail>(
            r#"
            SELECT p.product_id, p.producer_id, u.name AS producer_name, p.category_id,
                c.name AS category_name, p.name, p.description, p.unit, p.price,
                p.discount_percent, p.promotion_active, p.stock_quantity, p.is_active, p.created_utc
            FROM products p
            JOIN users u ON u.user_id = p.producer_id
            JOIN categories c ON c.category_id = p.category_id
            WHERE p.product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get product: {}", e)))?;

        timer.observe_duration();

        Ok(product)
    }

    /// List active products with optional category/search filters.
    /// Returns the page of rows and the total row count for pagination.
    #[instrument(skip(self, filter))]
    pub async fn list_products(
        &self,
        filter: &ListProductsFilter,
    ) -> Result<(Vec<ProductDetail>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_products"])
            .start_timer();

        let page_size = filter.page_size.clamp(1, 100);
        let offset = (filter.page.max(1) - 1) * page_size;
        let search = filter.search.as_ref().map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM products p
            WHERE p.is_active = TRUE
              AND ($1::uuid IS NULL OR p.category_id = $1)
              AND ($2::text IS NULL OR p.name ILIKE $2)
            "#,
        )
        .bind(filter.category_id)
        .bind(&search)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count products: {}", e)))?;

        let products = sqlx::query_as::<_, ProductDetail>(
            r#"
            SELECT p.product_id, p.producer_id, u.name AS producer_name, p.category_id,
                c.name AS category_name, p.name, p.description, p.unit, p.price,
                p.discount_percent, p.promotion_active, p.stock_quantity, p.is_active, p.created_utc
            FROM products p
            JOIN users u ON u.user_id = p.producer_id
            JOIN categories c ON c.category_id = p.category_id
            WHERE p.is_active = TRUE
              AND ($1::uuid IS NULL OR p.category_id = $1)
              AND ($2::text IS NULL OR p.name ILIKE $2)
            ORDER BY p.name
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.category_id)
        .bind(&search)
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list products: {}", e)))?;

        timer.observe_duration();

        Ok((products, total))
    }

    /// Update a product, scoped to its owning producer.
    #[instrument(skip(self, input), fields(product_id = %product_id, producer_id = %producer_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        producer_id: Uuid,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_product"])
            .start_timer();

        // Two-valued discount update: None = keep, Some(None) = clear.
        let (set_discount, discount) = match &input.discount_percent {
            Some(value) => (true, *value),
            None => (false, None),
        };

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET category_id = COALESCE($3, category_id),
                name = COALESCE($4, name),
                description = COALESCE($5, description),
                unit = COALESCE($6, unit),
                price = COALESCE($7, price),
                discount_percent = CASE WHEN $8 THEN $9 ELSE discount_percent END,
                promotion_active = COALESCE($10, promotion_active),
                stock_quantity = COALESCE($11, stock_quantity),
                is_active = COALESCE($12, is_active),
                updated_utc = NOW()
            WHERE product_id = $1 AND producer_id = $2
            RETURNING product_id, producer_id, category_id, name, description, unit, price,
                discount_percent, promotion_active, stock_quantity, is_active, created_utc, updated_utc
            "#,
        )
        .bind(product_id)
        .bind(producer_id)
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.unit)
        .bind(input.price)
        .bind(set_discount)
        .bind(discount)
        .bind(input.promotion_active)
        .bind(input.stock_quantity)
        .bind(input.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update product: {}", e)))?;

        timer.observe_duration();

        Ok(product)
    }

    /// Deactivate a product (products referenced by orders are never
    /// physically deleted).
    #[instrument(skip(self), fields(product_id = %product_id, producer_id = %producer_id))]
    pub async fn deactivate_product(
        &self,
        product_id: Uuid,
        producer_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["deactivate_product"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = FALSE, updated_utc = NOW()
            WHERE product_id = $1 AND producer_id = $2
            "#,
        )
        .bind(product_id)
        .bind(producer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to deactivate product: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Cart Operations
    // -------------------------------------------------------------------------

    /// Get the user's cart, creating it on first use.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_or_create_cart(&self, user_id: Uuid) -> Result<Cart, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_or_create_cart"])
            .start_timer();

        let cart = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (cart_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET updated_utc = carts.updated_utc
            RETURNING cart_id, user_id, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get cart: {}", e)))?;

        timer.observe_duration();

        Ok(cart)
    }

    /// Get the user's cart with its lines joined to live product fields.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart_with_items(&self, user_id: Uuid) -> Result<CartWithItems, AppError> {
        let cart = self.get_or_create_cart(user_id).await?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_cart_with_items"])
            .start_timer();

        let items = sqlx::query_as::<_, CartItemDetail>(
            r#"
            SELECT ci.cart_item_id, ci.product_id, p.name AS product_name, p.unit, ci.quantity,
                p.price, p.discount_percent, p.promotion_active, p.stock_quantity, p.is_active
            FROM cart_items ci
            JOIN products p ON p.product_id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_utc
            "#,
        )
        .bind(cart.cart_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load cart items: {}", e)))?;

        timer.observe_duration();

        Ok(CartWithItems { cart, items })
    }

    /// Add a product to the cart; adding an existing product accumulates
    /// its quantity.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn add_cart_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItem, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["add_cart_item"])
            .start_timer();

        let item = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (cart_item_id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING cart_item_id, cart_id, product_id, quantity, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!("Product not found"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to add cart item: {}", e)),
        })?;

        timer.observe_duration();

        Ok(item)
    }

    /// Replace a cart line's quantity, scoped to the owning cart.
    #[instrument(skip(self), fields(cart_id = %cart_id, cart_item_id = %cart_item_id))]
    pub async fn update_cart_item(
        &self,
        cart_id: Uuid,
        cart_item_id: Uuid,
        quantity: i32,
    ) -> Result<Option<CartItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_cart_item"])
            .start_timer();

        let item = sqlx::query_as::<_, CartItem>(
            r#"
            UPDATE cart_items
            SET quantity = $3
            WHERE cart_item_id = $1 AND cart_id = $2
            RETURNING cart_item_id, cart_id, product_id, quantity, created_utc
            "#,
        )
        .bind(cart_item_id)
        .bind(cart_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update cart item: {}", e))
        })?;

        timer.observe_duration();

        Ok(item)
    }

    /// Remove a cart line, scoped to the owning cart.
    #[instrument(skip(self), fields(cart_id = %cart_id, cart_item_id = %cart_item_id))]
    pub async fn remove_cart_item(
        &self,
        cart_id: Uuid,
        cart_item_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["remove_cart_item"])
            .start_timer();

        let result =
            sqlx::query("DELETE FROM cart_items WHERE cart_item_id = $1 AND cart_id = $2")
                .bind(cart_item_id)
                .bind(cart_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to remove cart item: {}", e))
                })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }
}
