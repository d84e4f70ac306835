//! Shift Model (班次管理)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shift status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum ShiftStatus {
    #[default]
    Open,
    Closed,
}

impl fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Closed => "closed",
        })
    }
}

/// A staff member's cash shift
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StaffShift {
    pub id: i64,
    pub user_id: i64,
    pub status: ShiftStatus,
    /// Shift start (Unix millis)
    pub start_time: i64,
    /// Shift end (Unix millis), null while open
    pub end_time: Option<i64>,
    pub starting_cash: f64,
    /// Cash counted at close
    pub cash_sales_actual: Option<f64>,
    /// Cash sales recorded by the system during the shift, set at close
    pub expected_cash: Option<f64>,
    /// cash_sales_actual - expected_cash (positive = surplus, negative = shortage)
    pub cash_variance: Option<f64>,
    pub note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Open shift payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftStart {
    #[serde(default)]
    pub starting_cash: f64,
    pub note: Option<String>,
}

/// Close shift payload (cash counting)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftEnd {
    pub cash_sales_actual: f64,
    pub note: Option<String>,
}

/// Reconciliation report for one shift
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftReport {
    pub shift: StaffShift,
    /// Stored value for closed shifts, live value for open ones
    pub expected_cash: f64,
    /// Only known once the shift is closed
    pub cash_variance: Option<f64>,
    /// Number of cash orders counted into expected_cash
    pub cash_order_count: i64,
}
