//! Order lifecycle state machine.
//!
//! Happy path: pending -> confirmed -> preparing -> shipped -> delivered,
//! with cancellation reachable from pending or confirmed only. Delivered
//! and cancelled are terminal. No ordering is enforced among the four
//! non-terminal update targets; callers progress orders at their own pace.

use super::error::OrderError;
use crate::models::OrderStatus;

/// True iff the order can still be cancelled.
pub fn can_cancel(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Pending | OrderStatus::Confirmed)
}

/// True iff the order has reached a terminal state.
pub fn is_finalized(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Delivered | OrderStatus::Cancelled)
}

/// Parse and validate a status-update target. Only the four progression
/// statuses are accepted; `pending` and `cancelled` are never valid
/// targets (orders start pending, and cancellation has its own path).
pub fn validate_update_target(value: &str) -> Result<OrderStatus, OrderError> {
    match value {
        "confirmed" => Ok(OrderStatus::Confirmed),
        "preparing" => Ok(OrderStatus::Preparing),
        "shipped" => Ok(OrderStatus::Shipped),
        "delivered" => Ok(OrderStatus::Delivered),
        other => Err(OrderError::InvalidStatus {
            value: other.to_string(),
        }),
    }
}

/// Check that `current` may be updated to `target`. The target itself must
/// already have passed [`validate_update_target`].
pub fn check_update(current: OrderStatus, target: OrderStatus) -> Result<(), OrderError> {
    if is_finalized(current) {
        return Err(OrderError::AlreadyFinalized {
            status: current.as_str().to_string(),
        });
    }
    debug_assert!(!matches!(target, OrderStatus::Pending | OrderStatus::Cancelled));
    Ok(())
}

/// Check that an order in `current` status may be cancelled.
pub fn check_cancel(current: OrderStatus) -> Result<(), OrderError> {
    if can_cancel(current) {
        Ok(())
    } else {
        Err(OrderError::NotCancellable {
            status: current.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_cancel_pending_and_confirmed_only() {
        assert!(can_cancel(OrderStatus::Pending));
        assert!(can_cancel(OrderStatus::Confirmed));
        assert!(!can_cancel(OrderStatus::Preparing));
        assert!(!can_cancel(OrderStatus::Shipped));
        assert!(!can_cancel(OrderStatus::Delivered));
        assert!(!can_cancel(OrderStatus::Cancelled));
    }

    #[test]
    fn test_is_finalized_terminal_states() {
        assert!(is_finalized(OrderStatus::Delivered));
        assert!(is_finalized(OrderStatus::Cancelled));
        assert!(!is_finalized(OrderStatus::Pending));
        assert!(!is_finalized(OrderStatus::Shipped));
    }

    #[test]
    fn test_update_target_accepts_progression_statuses() {
        assert_eq!(
            validate_update_target("confirmed").unwrap(),
            OrderStatus::Confirmed
        );
        assert_eq!(
            validate_update_target("delivered").unwrap(),
            OrderStatus::Delivered
        );
    }

    #[test]
    fn test_update_target_rejects_pending_cancelled_and_garbage() {
        for value in ["pending", "cancelled", "shipped!", "", "DELIVERED"] {
            let err = validate_update_target(value).unwrap_err();
            assert!(matches!(err, OrderError::InvalidStatus { .. }));
        }
    }

    #[test]
    fn test_update_rejected_on_finalized_order() {
        let err = check_update(OrderStatus::Delivered, OrderStatus::Confirmed).unwrap_err();
        assert!(matches!(err, OrderError::AlreadyFinalized { .. }));

        let err = check_update(OrderStatus::Cancelled, OrderStatus::Shipped).unwrap_err();
        assert!(matches!(err, OrderError::AlreadyFinalized { .. }));
    }

    #[test]
    fn test_update_allows_any_order_among_progression_statuses() {
        // Backward moves are accepted; the machine only guards terminals.
        assert!(check_update(OrderStatus::Shipped, OrderStatus::Confirmed).is_ok());
        assert!(check_update(OrderStatus::Pending, OrderStatus::Delivered).is_ok());
    }

    #[test]
    fn test_cancel_guard() {
        assert!(check_cancel(OrderStatus::Pending).is_ok());
        assert!(check_cancel(OrderStatus::Confirmed).is_ok());
        let err = check_cancel(OrderStatus::Shipped).unwrap_err();
        assert!(matches!(err, OrderError::NotCancellable { .. }));
    }
}
