//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! SQLite TEXT has no built-in length enforcement, so limits live here.

use crate::db::repository::order::MAX_PAGE_SIZE;
use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Item names, street, city
pub const MAX_NAME_LEN: usize = 200;

/// Notes, special instructions
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: payment method, coupon code, postal code
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Page size when a list request names none
pub const DEFAULT_PAGE_SIZE: i64 = 50;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_field(field, "must not be empty"));
    }
    if value.len() > max_len {
        return Err(AppError::invalid_field(
            field,
            format!("is too long ({} chars, max {max_len})", value.len()),
        ));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::invalid_field(
            field,
            format!("is too long ({} chars, max {max_len})", v.len()),
        ));
    }
    Ok(())
}

/// Resolve `limit`/`offset` query params. The limit is clamped to
/// `1..=MAX_PAGE_SIZE`; a negative offset is rejected.
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> Result<(i64, i64), AppError> {
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::invalid_field("offset", "must be non-negative"));
    }
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    Ok((limit, offset))
}
