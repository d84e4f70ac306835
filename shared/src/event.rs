//! 领域事件定义
//!
//! Events emitted by the server after a successful mutation. A notification
//! collaborator subscribes to them; the server only guarantees emission.

use crate::models::{OrderStatus, PaymentStatus, RiderStatus};
use serde::{Deserialize, Serialize};

/// Domain event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderCreated {
        order_id: i64,
        order_number: String,
        customer_id: Option<i64>,
    },
    OrderStatusChanged {
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    },
    PaymentStatusChanged {
        order_id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
    },
    RiderAssigned {
        order_id: i64,
        rider_id: i64,
    },
    RiderStatusChanged {
        rider_id: i64,
        from: RiderStatus,
        to: RiderStatus,
    },
    ShiftOpened {
        shift_id: i64,
        user_id: i64,
    },
    ShiftClosed {
        shift_id: i64,
        user_id: i64,
        cash_variance: f64,
    },
}

impl DomainEvent {
    /// Stable event name, matches the serde tag
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order_created",
            Self::OrderStatusChanged { .. } => "order_status_changed",
            Self::PaymentStatusChanged { .. } => "payment_status_changed",
            Self::RiderAssigned { .. } => "rider_assigned",
            Self::RiderStatusChanged { .. } => "rider_status_changed",
            Self::ShiftOpened { .. } => "shift_opened",
            Self::ShiftClosed { .. } => "shift_closed",
        }
    }
}

/// Event with emission metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Monotonic sequence per server process
    pub seq: u64,
    /// Principal whose request produced the event
    pub actor_id: i64,
    /// Unix millis
    pub timestamp: i64,
    pub event: DomainEvent,
}
