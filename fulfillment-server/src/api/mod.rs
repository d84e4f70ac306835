//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查 (公开)
//! - [`orders`] - 订单接口
//! - [`rider`] - 骑手接口 (含经理管理骑手状态)
//! - [`shifts`] - 班次接口
//!
//! Handlers stay thin: extract, call the service with the principal, wrap.

pub mod health;
pub mod orders;
pub mod rider;
pub mod shifts;

use axum::Router;

use crate::core::ServerState;

/// Every API route, before auth and state are attached
pub fn routes() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(rider::router())
        .merge(shifts::router())
}
