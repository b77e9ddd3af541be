//! Price computation for order lines.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to 2 decimal places, half-up.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The effective unit price of a product: list price with the promotion
/// discount applied when one is active, else the list price.
pub fn final_unit_price(
    price: Decimal,
    discount_percent: Option<Decimal>,
    promotion_active: bool,
) -> Decimal {
    let discount = if promotion_active {
        discount_percent.unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };
    round_money(price * (Decimal::ONE_HUNDRED - discount) / Decimal::ONE_HUNDRED)
}

/// Line subtotal: unit price times quantity.
pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal literal")
    }

    #[test]
    fn test_active_discount_is_applied() {
        let price = final_unit_price(dec("10.00"), Some(dec("20")), true);
        assert_eq!(price, dec("8.00"));
    }

    #[test]
    fn test_inactive_promotion_keeps_list_price() {
        let price = final_unit_price(dec("10.00"), Some(dec("20")), false);
        assert_eq!(price, dec("10.00"));
    }

    #[test]
    fn test_missing_discount_keeps_list_price() {
        let price = final_unit_price(dec("7.35"), None, true);
        assert_eq!(price, dec("7.35"));
    }

    #[test]
    fn test_discounted_price_rounds_half_up() {
        // 9.99 * 0.85 = 8.4915 -> 8.49; 9.99 * 0.75 = 7.4925 -> 7.49
        assert_eq!(final_unit_price(dec("9.99"), Some(dec("15")), true), dec("8.49"));
        // 0.125 midpoint rounds away from zero
        assert_eq!(round_money(dec("0.125")), dec("0.13"));
    }

    #[test]
    fn test_line_subtotal() {
        assert_eq!(line_subtotal(dec("5.00"), 2), dec("10.00"));
        assert_eq!(line_subtotal(dec("3.50"), 1), dec("3.50"));
    }
}
