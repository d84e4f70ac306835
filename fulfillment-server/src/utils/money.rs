//! Monetary arithmetic
//!
//! Amounts are carried as `f64` on the wire and in SQLite, but every sum,
//! product and comparison goes through `rust_decimal` so that results are
//! exact to the cent.

use rust_decimal::prelude::*;

use crate::utils::{AppError, AppResult, ErrorCode};

/// Currency precision
pub const DECIMAL_PLACES: u32 = 2;

/// Two amounts closer than this are considered equal (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Upper bound for any single amount accepted from a client
pub const MAX_AMOUNT: f64 = 1_000_000.0;

/// Convert f64 to Decimal for calculation
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in monetary calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64, rounded half-up to the cent
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Round an amount to the cent
pub fn round(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// Reject NaN, infinities, negatives and absurdly large amounts.
pub fn validate_amount(value: f64, field: &str) -> AppResult<()> {
    if !value.is_finite() {
        return Err(AppError::field_error(
            ErrorCode::PaymentInvalidAmount,
            field,
            "must be a finite number",
        ));
    }
    if value < 0.0 {
        return Err(AppError::field_error(
            ErrorCode::PaymentInvalidAmount,
            field,
            format!("must be non-negative, got {value}"),
        ));
    }
    if value > MAX_AMOUNT {
        return Err(AppError::field_error(
            ErrorCode::PaymentInvalidAmount,
            field,
            format!("exceeds maximum allowed value of {MAX_AMOUNT}"),
        ));
    }
    Ok(())
}

/// unit_price × quantity
pub fn line_total(unit_price: f64, quantity: i64) -> f64 {
    to_f64(to_decimal(unit_price) * Decimal::from(quantity))
}

/// Exact sum of amounts
pub fn sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    to_f64(values.into_iter().map(to_decimal).sum())
}

/// total = subtotal + tax + delivery_charge - discount
///
/// A discount larger than everything else would make the total negative,
/// which is rejected on `discount_amount`.
pub fn order_total(subtotal: f64, tax: f64, discount: f64, delivery_charge: f64) -> AppResult<f64> {
    let total = to_decimal(subtotal) + to_decimal(tax) + to_decimal(delivery_charge)
        - to_decimal(discount);
    if total < Decimal::ZERO {
        return Err(AppError::invalid_field(
            "discount_amount",
            "exceeds the order amount",
        ));
    }
    Ok(to_f64(total))
}

/// Equal within [`MONEY_TOLERANCE`]
pub fn matches(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() < MONEY_TOLERANCE
}

/// actual - expected (positive = surplus, negative = shortage)
pub fn variance(actual: f64, expected: f64) -> f64 {
    to_f64(to_decimal(actual) - to_decimal(expected))
}
