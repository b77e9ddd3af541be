//! Cart-to-order assembly: validates cart lines against catalog snapshots
//! and computes price-at-purchase lines and the order total. Pure function
//! of its inputs; the caller is responsible for reading the snapshots
//! inside the same transaction that will apply the stock decrements.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::OrderError;
use super::pricing::{final_unit_price, line_subtotal, round_money};

/// A cart line as stored: product reference plus desired quantity.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Catalog state for one product, captured at assembly time.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub promotion_active: bool,
    pub stock_quantity: i32,
    pub is_active: bool,
}

/// An order line with its captured unit price and subtotal.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone)]
pub struct AssembledOrder {
    pub lines: Vec<PricedLine>,
    pub total: Decimal,
}

/// Validate the cart and build priced order lines.
///
/// Fail-fast validation order: empty cart, then product availability for
/// every line, then stock sufficiency for every line.
pub fn assemble(
    lines: &[CartLine],
    snapshots: &HashMap<Uuid, ProductSnapshot>,
) -> Result<AssembledOrder, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    for line in lines {
        match snapshots.get(&line.product_id) {
            Some(snapshot) if snapshot.is_active => {}
            Some(snapshot) => {
                return Err(OrderError::ProductUnavailable {
                    name: snapshot.name.clone(),
                });
            }
            None => {
                return Err(OrderError::ProductUnavailable {
                    name: line.product_id.to_string(),
                });
            }
        }
    }

    for line in lines {
        let snapshot = &snapshots[&line.product_id];
        if snapshot.stock_quantity < line.quantity {
            return Err(OrderError::InsufficientStock {
                name: snapshot.name.clone(),
                available: snapshot.stock_quantity,
            });
        }
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    for line in lines {
        let snapshot = &snapshots[&line.product_id];
        let unit_price = final_unit_price(
            snapshot.price,
            snapshot.discount_percent,
            snapshot.promotion_active,
        );
        let subtotal = line_subtotal(unit_price, line.quantity);
        total += subtotal;
        priced.push(PricedLine {
            product_id: line.product_id,
            product_name: snapshot.name.clone(),
            quantity: line.quantity,
            unit_price,
            subtotal,
        });
    }

    Ok(AssembledOrder {
        lines: priced,
        total: round_money(total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal literal")
    }

    fn snapshot(name: &str, price: &str, stock: i32) -> ProductSnapshot {
        ProductSnapshot {
            product_id: Uuid::new_v4(),
            name: name.to_string(),
            price: dec(price),
            discount_percent: None,
            promotion_active: false,
            stock_quantity: stock,
            is_active: true,
        }
    }

    fn index(snapshots: Vec<ProductSnapshot>) -> HashMap<Uuid, ProductSnapshot> {
        snapshots.into_iter().map(|s| (s.product_id, s)).collect()
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let err = assemble(&[], &HashMap::new()).unwrap_err();
        assert!(matches!(err, OrderError::EmptyCart));
    }

    #[test]
    fn test_totals_sum_line_subtotals() {
        let a = snapshot("Carrots", "5.00", 10);
        let b = snapshot("Honey", "3.50", 10);
        let lines = vec![
            CartLine { product_id: a.product_id, quantity: 2 },
            CartLine { product_id: b.product_id, quantity: 1 },
        ];
        let assembled = assemble(&lines, &index(vec![a, b])).unwrap();

        assert_eq!(assembled.lines.len(), 2);
        assert_eq!(assembled.lines[0].subtotal, dec("10.00"));
        assert_eq!(assembled.lines[1].subtotal, dec("3.50"));
        assert_eq!(assembled.total, dec("13.50"));
    }

    #[test]
    fn test_active_discount_snapshots_into_unit_price() {
        let mut a = snapshot("Strawberries", "10.00", 5);
        a.discount_percent = Some(dec("20"));
        a.promotion_active = true;
        let lines = vec![CartLine { product_id: a.product_id, quantity: 1 }];
        let assembled = assemble(&lines, &index(vec![a])).unwrap();

        assert_eq!(assembled.lines[0].unit_price, dec("8.00"));
        assert_eq!(assembled.total, dec("8.00"));
    }

    #[test]
    fn test_inactive_product_is_rejected() {
        let mut a = snapshot("Eggs", "4.00", 10);
        a.is_active = false;
        let lines = vec![CartLine { product_id: a.product_id, quantity: 1 }];
        let err = assemble(&lines, &index(vec![a])).unwrap_err();

        match err {
            OrderError::ProductUnavailable { name } => assert_eq!(name, "Eggs"),
            other => panic!("expected ProductUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_insufficient_stock_reports_available() {
        let a = snapshot("Kale", "2.00", 3);
        let lines = vec![CartLine { product_id: a.product_id, quantity: 4 }];
        let err = assemble(&lines, &index(vec![a])).unwrap_err();

        match err {
            OrderError::InsufficientStock { name, available } => {
                assert_eq!(name, "Kale");
                assert_eq!(available, 3);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_availability_is_checked_before_stock() {
        // First line would fail on stock, second on availability; the
        // availability pass runs first across the whole cart.
        let a = snapshot("Kale", "2.00", 1);
        let mut b = snapshot("Eggs", "4.00", 10);
        b.is_active = false;
        let lines = vec![
            CartLine { product_id: a.product_id, quantity: 5 },
            CartLine { product_id: b.product_id, quantity: 1 },
        ];
        let err = assemble(&lines, &index(vec![a, b])).unwrap_err();
        assert!(matches!(err, OrderError::ProductUnavailable { .. }));
    }

    #[test]
    fn test_missing_snapshot_is_unavailable() {
        let lines = vec![CartLine { product_id: Uuid::new_v4(), quantity: 1 }];
        let err = assemble(&lines, &HashMap::new()).unwrap_err();
        assert!(matches!(err, OrderError::ProductUnavailable { .. }));
    }

    #[test]
    fn test_exact_stock_passes() {
        let a = snapshot("Beets", "1.25", 4);
        let lines = vec![CartLine { product_id: a.product_id, quantity: 4 }];
        let assembled = assemble(&lines, &index(vec![a])).unwrap();
        assert_eq!(assembled.total, dec("5.00"));
    }
}
