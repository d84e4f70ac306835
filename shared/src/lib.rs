//! Shared types for the fulfillment backend
//!
//! Data models, the closed capability set, domain events and the unified
//! error system. Used by `fulfillment-server` and by any client talking to it.

pub mod error;
pub mod event;
pub mod models;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use event::{DomainEvent, EventEnvelope};
pub use http;
pub use serde::{Deserialize, Serialize};
