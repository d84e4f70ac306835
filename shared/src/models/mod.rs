//! Data models
//!
//! Shared between the server and its clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` snowflakes, all timestamps Unix millis.

pub mod order;
pub mod rider;
pub mod role;
pub mod shift;
pub mod user;

// Re-exports
pub use order::*;
pub use rider::*;
pub use role::*;
pub use shift::*;
pub use user::*;
