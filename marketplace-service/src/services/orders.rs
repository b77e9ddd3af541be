//! Order placement and lifecycle service.
//!
//! Placement runs as one Postgres transaction: load the cart, resolve and
//! snapshot the delivery address, read catalog snapshots, assemble the
//! order (pure validation + pricing), write the order and its lines,
//! decrement stock, clear the cart, commit. Every participating query
//! takes the transaction value explicitly, so the atomic unit is visible
//! in the signatures. Any error before commit rolls the whole unit back.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use service_core::error::AppError;

use crate::domain::{
    CartLine, OrderError, ProductSnapshot, assembler, assembler::PricedLine, lifecycle,
};
use crate::models::{
    Address, ListOrdersFilter, Order, OrderItemDetail, OrderStatus, OrderWithItems,
};
use crate::services::database::Database;
use crate::services::metrics::{DB_QUERY_DURATION, ORDERS_TOTAL, STOCK_REJECTIONS_TOTAL};

const ORDER_COLUMNS: &str = "order_id, buyer_id, status, total_amount, delivery_street, \
     delivery_number, delivery_complement, delivery_district, delivery_city, delivery_state, \
     delivery_postal_code, notes, created_utc, delivered_utc";

#[derive(Clone)]
pub struct OrderService {
    db: Database,
}

impl OrderService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Place an order from the buyer's cart: all-or-nothing, with prices
    /// and the delivery address captured at this instant.
    #[instrument(skip(self, notes), fields(buyer_id = %buyer_id))]
    pub async fn place_order(
        &self,
        buyer_id: Uuid,
        address_id: Option<Uuid>,
        notes: Option<String>,
    ) -> Result<OrderWithItems, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["place_order"])
            .start_timer();

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(OrderError::Transaction)?;

        match place_order_tx(&mut tx, buyer_id, address_id, notes).await {
            Ok(order) => {
                tx.commit().await.map_err(OrderError::Transaction)?;
                timer.observe_duration();

                ORDERS_TOTAL.with_label_values(&["placed"]).inc();
                info!(
                    order_id = %order.order_id,
                    total = %order.total_amount,
                    "Order placed"
                );

                let items = self.load_order_items(order.order_id).await?;
                Ok(OrderWithItems { order, items })
            }
            Err(err) => {
                // Explicit for clarity; dropping the transaction would
                // also roll back.
                tx.rollback().await.ok();
                timer.observe_duration();

                ORDERS_TOTAL.with_label_values(&["rejected"]).inc();
                if matches!(err, OrderError::InsufficientStock { .. }) {
                    STOCK_REJECTIONS_TOTAL.with_label_values(&["assembly"]).inc();
                }
                Err(err.into())
            }
        }
    }

    /// Cancel an order, restoring the stock of every line. Allowed while
    /// the order is pending or confirmed; the guard is re-checked after
    /// the row lock is held so a concurrent status update cannot race it.
    #[instrument(skip(self), fields(order_id = %order_id, buyer_id = %buyer_id))]
    pub async fn cancel_order(&self, order_id: Uuid, buyer_id: Uuid) -> Result<Order, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["cancel_order"])
            .start_timer();

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(OrderError::Transaction)?;

        match cancel_order_tx(&mut tx, order_id, buyer_id).await {
            Ok(order) => {
                tx.commit().await.map_err(OrderError::Transaction)?;
                timer.observe_duration();

                ORDERS_TOTAL.with_label_values(&["cancelled"]).inc();
                info!(order_id = %order.order_id, "Order cancelled, stock restored");
                Ok(order)
            }
            Err(err) => {
                tx.rollback().await.ok();
                timer.observe_duration();
                Err(err.into())
            }
        }
    }

    /// Progress an order's status. Only producers with a line in the
    /// order may update it; finalized orders are rejected; reaching
    /// `delivered` stamps the delivery timestamp.
    #[instrument(skip(self), fields(order_id = %order_id, producer_id = %producer_id, target = %target))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        producer_id: Uuid,
        target: &str,
    ) -> Result<Order, AppError> {
        let target = lifecycle::validate_update_target(target)?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_order_status"])
            .start_timer();

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(OrderError::Transaction)?;

        let order = lock_order(&mut tx, order_id)
            .await?
            .ok_or(OrderError::OrderNotFound)?;

        let supplies_order = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM order_items oi
                JOIN products p ON p.product_id = oi.product_id
                WHERE oi.order_id = $1 AND p.producer_id = $2
            )
            "#,
        )
        .bind(order_id)
        .bind(producer_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(OrderError::Transaction)?;

        if !supplies_order {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "No product of yours is part of this order"
            )));
        }

        lifecycle::check_update(order.status(), target)?;

        let updated = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $2,
                delivered_utc = CASE WHEN $2 = 'delivered' THEN NOW() ELSE delivered_utc END
            WHERE order_id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(target.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(OrderError::Transaction)?;

        tx.commit().await.map_err(OrderError::Transaction)?;
        timer.observe_duration();

        info!(order_id = %order_id, status = %updated.status, "Order status updated");

        Ok(updated)
    }

    /// Get an order with its lines. Visible to its buyer and to any
    /// producer supplying a line of it.
    #[instrument(skip(self), fields(order_id = %order_id, requester_id = %requester_id))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        requester_id: Uuid,
    ) -> Result<OrderWithItems, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_order"])
            .start_timer();

        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get order: {}", e)))?
        .ok_or(OrderError::OrderNotFound)?;

        if order.buyer_id != requester_id {
            let supplies_order = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS (
                    SELECT 1
                    FROM order_items oi
                    JOIN products p ON p.product_id = oi.product_id
                    WHERE oi.order_id = $1 AND p.producer_id = $2
                )
                "#,
            )
            .bind(order_id)
            .bind(requester_id)
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get order: {}", e)))?;

            if !supplies_order {
                return Err(OrderError::OrderNotFound.into());
            }
        }

        let items = self.load_order_items(order_id).await?;
        timer.observe_duration();

        Ok(OrderWithItems { order, items })
    }

    /// List a buyer's orders, newest first.
    #[instrument(skip(self, filter), fields(buyer_id = %buyer_id))]
    pub async fn list_orders(
        &self,
        buyer_id: Uuid,
        filter: &ListOrdersFilter,
    ) -> Result<(Vec<Order>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_orders"])
            .start_timer();

        let page_size = filter.page_size.clamp(1, 100);
        let offset = (filter.page.max(1) - 1) * page_size;
        let status = filter.status.map(|s| s.as_str());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM orders
            WHERE buyer_id = $1 AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(buyer_id)
        .bind(status)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count orders: {}", e)))?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE buyer_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_utc DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(buyer_id)
        .bind(status)
        .bind(page_size)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list orders: {}", e)))?;

        timer.observe_duration();

        Ok((orders, total))
    }

    /// Load an order's lines joined with catalog display fields.
    async fn load_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItemDetail>, AppError> {
        let items = sqlx::query_as::<_, OrderItemDetail>(
            r#"
            SELECT oi.order_item_id, oi.order_id, oi.product_id, oi.product_name,
                c.name AS category_name, u.name AS producer_name, p.unit,
                oi.quantity, oi.unit_price, oi.subtotal
            FROM order_items oi
            JOIN products p ON p.product_id = oi.product_id
            JOIN categories c ON c.category_id = p.category_id
            JOIN users u ON u.user_id = p.producer_id
            WHERE oi.order_id = $1
            ORDER BY oi.sort_order
            "#,
        )
        .bind(order_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load order items: {}", e))
        })?;

        Ok(items)
    }
}

// -----------------------------------------------------------------------------
// Transaction-scoped steps. Each takes the open transaction explicitly.
// -----------------------------------------------------------------------------

async fn place_order_tx(
    tx: &mut Transaction<'_, Postgres>,
    buyer_id: Uuid,
    address_id: Option<Uuid>,
    notes: Option<String>,
) -> Result<Order, OrderError> {
    let (cart_id, lines) = load_cart(tx, buyer_id).await?;
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let address = resolve_delivery_address(tx, buyer_id, address_id).await?;

    let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let snapshots = read_catalog_snapshots(tx, &product_ids).await?;

    let assembled = assembler::assemble(&lines, &snapshots)?;

    let order = insert_order(tx, buyer_id, assembled.total, &address, notes).await?;
    insert_order_items(tx, order.order_id, &assembled.lines).await?;

    // Lock product rows in a stable order so two concurrent checkouts
    // over the same products cannot deadlock.
    let mut decrements: Vec<_> = assembled.lines.iter().collect();
    decrements.sort_by_key(|line| line.product_id);
    for line in decrements {
        decrement_stock(tx, line.product_id, line.quantity).await?;
    }

    clear_cart(tx, cart_id).await?;

    Ok(order)
}

async fn cancel_order_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    buyer_id: Uuid,
) -> Result<Order, OrderError> {
    let order = lock_order(tx, order_id)
        .await?
        .ok_or(OrderError::OrderNotFound)?;

    if order.buyer_id != buyer_id {
        return Err(OrderError::OrderNotFound);
    }

    // Guard must hold under the row lock, not just before it.
    lifecycle::check_cancel(order.status())?;

    let lines = sqlx::query_as::<_, (Uuid, i32)>(
        "SELECT product_id, quantity FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;

    for (product_id, quantity) in lines {
        increment_stock(tx, product_id, quantity).await?;
    }

    let cancelled = sqlx::query_as::<_, Order>(&format!(
        r#"
        UPDATE orders
        SET status = 'cancelled'
        WHERE order_id = $1
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(order_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(cancelled)
}

/// Load the buyer's cart id and its lines in insertion order.
async fn load_cart(
    tx: &mut Transaction<'_, Postgres>,
    buyer_id: Uuid,
) -> Result<(Uuid, Vec<CartLine>), OrderError> {
    let cart_id = sqlx::query_scalar::<_, Uuid>("SELECT cart_id FROM carts WHERE user_id = $1")
        .bind(buyer_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(OrderError::EmptyCart)?;

    let rows = sqlx::query_as::<_, (Uuid, i32)>(
        "SELECT product_id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY created_utc",
    )
    .bind(cart_id)
    .fetch_all(&mut **tx)
    .await?;

    let lines = rows
        .into_iter()
        .map(|(product_id, quantity)| CartLine {
            product_id,
            quantity,
        })
        .collect();

    Ok((cart_id, lines))
}

/// Resolve the delivery address: the explicit one (must belong to the
/// buyer) or the buyer's default. The caller copies its fields into the
/// order row, never a reference.
async fn resolve_delivery_address(
    tx: &mut Transaction<'_, Postgres>,
    buyer_id: Uuid,
    address_id: Option<Uuid>,
) -> Result<Address, OrderError> {
    const ADDRESS_COLUMNS: &str = "address_id, user_id, label, street, number, complement, \
         district, city, state, postal_code, is_default, created_utc, updated_utc";

    match address_id {
        Some(id) => sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE address_id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(buyer_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(OrderError::AddressNotFound),
        None => sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 AND is_default = TRUE"
        ))
        .bind(buyer_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(OrderError::NoDeliveryAddress),
    }
}

/// Read current catalog state for the given products, inside the order
/// transaction so the validation and the decrement see the same rows.
async fn read_catalog_snapshots(
    tx: &mut Transaction<'_, Postgres>,
    product_ids: &[Uuid],
) -> Result<HashMap<Uuid, ProductSnapshot>, OrderError> {
    let rows = sqlx::query_as::<_, (Uuid, String, Decimal, Option<Decimal>, bool, i32, bool)>(
        r#"
        SELECT product_id, name, price, discount_percent, promotion_active, stock_quantity, is_active
        FROM products
        WHERE product_id = ANY($1)
        "#,
    )
    .bind(product_ids)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(product_id, name, price, discount_percent, promotion_active, stock_quantity, is_active)| {
                (
                    product_id,
                    ProductSnapshot {
                        product_id,
                        name,
                        price,
                        discount_percent,
                        promotion_active,
                        stock_quantity,
                        is_active,
                    },
                )
            },
        )
        .collect())
}

async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    buyer_id: Uuid,
    total: Decimal,
    address: &Address,
    notes: Option<String>,
) -> Result<Order, OrderError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        r#"
        INSERT INTO orders (order_id, buyer_id, status, total_amount, delivery_street,
            delivery_number, delivery_complement, delivery_district, delivery_city,
            delivery_state, delivery_postal_code, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(buyer_id)
    .bind(OrderStatus::Pending.as_str())
    .bind(total)
    .bind(&address.street)
    .bind(&address.number)
    .bind(&address.complement)
    .bind(&address.district)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.postal_code)
    .bind(notes)
    .fetch_one(&mut **tx)
    .await?;

    Ok(order)
}

async fn insert_order_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    lines: &[PricedLine],
) -> Result<(), OrderError> {
    for (index, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_item_id, order_id, product_id, product_name,
                quantity, unit_price, subtotal, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal)
        .bind(index as i32)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Atomically decrement a product's stock. The conditional update is the
/// correctness guarantee under concurrency: a competing transaction that
/// decremented first makes this affect zero rows, which aborts the whole
/// placement with `InsufficientStock` regardless of isolation level.
async fn decrement_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), OrderError> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - $2, updated_utc = NOW()
        WHERE product_id = $1 AND stock_quantity >= $2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        STOCK_REJECTIONS_TOTAL.with_label_values(&["decrement"]).inc();

        let current = sqlx::query_as::<_, (String, i32)>(
            "SELECT name, stock_quantity FROM products WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;

        return Err(match current {
            Some((name, available)) => OrderError::InsufficientStock { name, available },
            None => OrderError::ProductUnavailable {
                name: product_id.to_string(),
            },
        });
    }

    Ok(())
}

/// Restore stock for a cancelled order line.
async fn increment_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), OrderError> {
    sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + $2, updated_utc = NOW()
        WHERE product_id = $1
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Delete the cart's lines; the cart row itself persists, now empty.
async fn clear_cart(tx: &mut Transaction<'_, Postgres>, cart_id: Uuid) -> Result<(), OrderError> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Lock an order row for the rest of the transaction.
async fn lock_order(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<Option<Order>, OrderError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 FOR UPDATE"
    ))
    .bind(order_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(order)
}
