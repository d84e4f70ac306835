//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use shared::models::{Order, OrderCreate, OrderUpdate};

use crate::auth::Principal;
use crate::core::ServerState;
use crate::orders::{ListOrdersQuery, service};
use crate::riders;
use crate::utils::AppResult;

/// GET /api/orders - 订单列表 (按可见性过滤)
pub async fn list(
    State(state): State<ServerState>,
    principal: Principal,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = service::index(&state, principal.user(), &query).await?;
    Ok(Json(orders))
}

/// POST /api/orders - 下单
pub async fn create(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<OrderCreate>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = service::create(&state, principal.user(), payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    let order = service::show(&state, principal.user(), id).await?;
    Ok(Json(order))
}

/// PUT /api/orders/{id} - 部分更新 (状态、支付、金额、骑手)
pub async fn update(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(payload): Json<OrderUpdate>,
) -> AppResult<Json<Order>> {
    let order = service::update(&state, principal.user(), id, payload).await?;
    Ok(Json(order))
}

/// DELETE /api/orders/{id}
pub async fn delete(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    service::destroy(&state, principal.user(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/orders/{id}/assign - 分配最近的在线骑手
pub async fn assign(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    let order = riders::service::assign(&state, principal.user(), id).await?;
    Ok(Json(order))
}
