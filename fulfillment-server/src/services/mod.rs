//! 服务模块
//!
//! - [`EventBus`] - 领域事件广播 (通知投递由外部订阅者负责)

pub mod event_bus;

pub use event_bus::EventBus;
