//! Role Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named capability a role either grants or withholds.
///
/// Closed set: every gated action in the server names one of these, and
/// adding an action means adding a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "can_place_orders")]
    PlaceOrders,
    #[serde(rename = "can_edit_orders")]
    EditOrders,
    #[serde(rename = "can_delete_orders")]
    DeleteOrders,
    #[serde(rename = "can_perform_delivery")]
    PerformDelivery,
    #[serde(rename = "can_manage_delivery")]
    ManageDelivery,
    #[serde(rename = "can_perform_shifts")]
    PerformShifts,
    #[serde(rename = "can_view_reports")]
    ViewReports,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::PlaceOrders,
        Capability::EditOrders,
        Capability::DeleteOrders,
        Capability::PerformDelivery,
        Capability::ManageDelivery,
        Capability::PerformShifts,
        Capability::ViewReports,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PlaceOrders => "can_place_orders",
            Self::EditOrders => "can_edit_orders",
            Self::DeleteOrders => "can_delete_orders",
            Self::PerformDelivery => "can_perform_delivery",
            Self::ManageDelivery => "can_manage_delivery",
            Self::PerformShifts => "can_perform_shifts",
            Self::ViewReports => "can_view_reports",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown capability: {s}"))
    }
}

/// Role entity (RBAC 角色)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// JSON array of capability names (e.g. ["can_place_orders"])
    #[cfg_attr(feature = "db", sqlx(json))]
    pub capabilities: Vec<Capability>,
    pub is_system: bool,
    pub is_active: bool,
}

impl Role {
    pub fn grants(&self, capability: Capability) -> bool {
        self.is_active && self.capabilities.contains(&capability)
    }
}
