//! User Model

use serde::{Deserialize, Serialize};

/// User as seen by the core: identity plus its single role reference.
///
/// Credentials live with the identity layer and never reach this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role_id: Option<i64>,
    pub is_active: bool,
}
