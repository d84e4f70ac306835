//! Rider Model

use super::order::Order;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rider presence status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum RiderStatus {
    Offline,
    Online,
    Busy,
}

impl RiderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for RiderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rider profile, one per rider user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RiderProfile {
    pub id: i64,
    pub user_id: i64,
    pub status: RiderStatus,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub last_location_update: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl RiderProfile {
    pub fn location(&self) -> Option<(f64, f64)> {
        Some((self.current_latitude?, self.current_longitude?))
    }
}

/// Update rider status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderStatusUpdate {
    pub status: RiderStatus,
}

/// Update rider location payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderLocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Rider dashboard: profile plus deliveries currently on the road
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderDashboard {
    pub profile: RiderProfile,
    pub active_orders: Vec<Order>,
}
