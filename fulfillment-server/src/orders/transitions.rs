//! 订单状态图
//!
//! ```text
//! pending → confirmed → preparing → ready → out_for_delivery → delivered
//!    │          │            │         │            │
//!    └──────────┴────────────┴─────────┴────────────┴──→ cancelled
//! ```
//!
//! Dine-in and takeaway orders skip `out_for_delivery` and go straight from
//! `ready` to `delivered` (handed over). Delivered and cancelled are terminal.
//!
//! Payment moves independently: unpaid → partial → paid → refunded, with
//! unpaid → paid allowed directly.
//!
//! Requesting the current status is always accepted as a no-op.

use shared::models::{OrderStatus, OrderType, PaymentStatus};

use crate::utils::{AppError, AppResult};

/// Statuses reachable in one step
pub fn next_statuses(order_type: OrderType, from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match (from, order_type) {
        (Pending, _) => &[Confirmed, Cancelled],
        (Confirmed, _) => &[Preparing, Cancelled],
        (Preparing, _) => &[Ready, Cancelled],
        (Ready, OrderType::Delivery) => &[OutForDelivery, Cancelled],
        (Ready, _) => &[Delivered, Cancelled],
        (OutForDelivery, _) => &[Delivered, Cancelled],
        (Delivered, _) | (Cancelled, _) => &[],
    }
}

/// Check an order status change
pub fn check_status(order_type: OrderType, from: OrderStatus, to: OrderStatus) -> AppResult<()> {
    if from == to || next_statuses(order_type, from).contains(&to) {
        Ok(())
    } else {
        Err(AppError::invalid_transition("order", from, to))
    }
}

/// Check a payment status change
///
/// `unpaid → paid` is allowed directly for orders settled in one payment.
pub fn check_payment(from: PaymentStatus, to: PaymentStatus) -> AppResult<()> {
    use PaymentStatus::*;
    let allowed = from == to
        || matches!(
            (from, to),
            (Unpaid, Partial) | (Unpaid, Paid) | (Partial, Paid) | (Paid, Refunded)
        );
    if allowed {
        Ok(())
    } else {
        Err(AppError::invalid_transition("payment", from, to))
    }
}
