//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Delivered and cancelled orders never move again
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status, orthogonal to [`OrderStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the order reaches the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum OrderType {
    Delivery,
    DineIn,
    Takeaway,
}

impl OrderType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::DineIn => "dine_in",
            Self::Takeaway => "takeaway",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment method code that identifies cash sales in the shift ledger
pub const CASH_PAYMENT_METHOD: &str = "cash";

/// Structured delivery address (stored as JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub street: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl DeliveryAddress {
    /// Both coordinates, when the address was geocoded
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Line item with name/price snapshots taken at order time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub item_name: String,
    pub unit_price: f64,
    pub quantity: i64,
    pub total_price: f64,
    pub special_instructions: Option<String>,
}

/// Order aggregate (row + items)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// `ORD-` + 10 uppercase alphanumerics
    pub order_number: String,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub delivery_charge: f64,
    /// subtotal + tax_amount + delivery_charge - discount_amount
    pub total_amount: f64,
    pub paid_amount: f64,
    pub table_id: Option<i64>,
    /// RiderProfile id
    pub rider_id: Option<i64>,
    /// Staff user handling the order
    pub staff_id: Option<i64>,
    /// Customer user who placed the order
    pub customer_id: Option<i64>,
    pub delivery_address: Option<DeliveryAddress>,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
    pub created_by: i64,
    pub updated_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
    /// Optimistic lock counter, bumped on every write
    pub version: i64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Order item input on creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub menu_item_id: i64,
    pub item_name: String,
    pub unit_price: f64,
    pub quantity: i64,
    pub special_instructions: Option<String>,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub order_type: OrderType,
    pub items: Vec<OrderItemInput>,
    pub subtotal: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub delivery_charge: f64,
    /// Client-computed total, checked against the components
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub paid_amount: f64,
    pub payment_method: Option<String>,
    pub table_id: Option<i64>,
    pub staff_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub delivery_address: Option<DeliveryAddress>,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
    /// Staff only
    pub status: Option<OrderStatus>,
    /// Staff only
    pub payment_status: Option<PaymentStatus>,
}

/// Partial update payload: absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<String>,
    pub paid_amount: Option<f64>,
    pub subtotal: Option<f64>,
    pub tax_amount: Option<f64>,
    pub discount_amount: Option<f64>,
    pub delivery_charge: Option<f64>,
    pub rider_id: Option<i64>,
    pub staff_id: Option<i64>,
    pub table_id: Option<i64>,
    pub notes: Option<String>,
}

impl OrderUpdate {
    /// True when the payload only asks to cancel the order
    pub fn is_cancel_only(&self) -> bool {
        self.is_status_only(OrderStatus::Cancelled)
    }

    /// True when the payload only moves the order to `status`
    pub fn is_status_only(&self, status: OrderStatus) -> bool {
        self.status == Some(status)
            && self.payment_status.is_none()
            && self.payment_method.is_none()
            && self.paid_amount.is_none()
            && !self.touches_money()
            && self.rider_id.is_none()
            && self.staff_id.is_none()
            && self.table_id.is_none()
            && self.notes.is_none()
    }

    /// True when any total component changes
    pub fn touches_money(&self) -> bool {
        self.subtotal.is_some()
            || self.tax_amount.is_some()
            || self.discount_amount.is_some()
            || self.delivery_charge.is_some()
    }
}
