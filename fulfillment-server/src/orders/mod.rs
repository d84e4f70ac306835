//! 订单模块
//!
//! - `transitions`: 订单/支付状态图
//! - `number`: `ORD-XXXXXXXXXX` 订单号
//! - `service`: create / update / show / index / destroy

pub mod number;
pub mod service;
pub mod transitions;

pub use service::ListOrdersQuery;
