//! Rider API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{Order, RiderDashboard, RiderLocationUpdate, RiderProfile, RiderStatusUpdate};

use crate::auth::Principal;
use crate::core::ServerState;
use crate::orders::ListOrdersQuery;
use crate::riders::service;
use crate::utils::{AppError, AppResult};

/// GET /api/rider/dashboard
pub async fn dashboard(
    State(state): State<ServerState>,
    principal: Principal,
) -> AppResult<Json<RiderDashboard>> {
    let board = service::dashboard(&state, principal.user()).await?;
    Ok(Json(board))
}

/// GET /api/rider/orders - 骑手的配送历史
pub async fn orders(
    State(state): State<ServerState>,
    principal: Principal,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = service::orders(&state, principal.user(), &query).await?;
    Ok(Json(orders))
}

/// PUT /api/rider/status - 骑手上线/下线
pub async fn update_status(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<RiderStatusUpdate>,
) -> AppResult<Json<RiderProfile>> {
    let user = principal.user().ok_or_else(AppError::unauthenticated)?;
    let profile = service::update_status(&state, Some(user), user.id, payload.status).await?;
    Ok(Json(profile))
}

/// PUT /api/rider/location - 上报位置
pub async fn update_location(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<RiderLocationUpdate>,
) -> AppResult<Json<RiderProfile>> {
    let user = principal.user().ok_or_else(AppError::unauthenticated)?;
    let profile = service::update_location(
        &state,
        Some(user),
        user.id,
        payload.latitude,
        payload.longitude,
    )
    .await?;
    Ok(Json(profile))
}

/// PUT /api/riders/{user_id}/status - 经理设置骑手状态
pub async fn update_rider_status(
    State(state): State<ServerState>,
    principal: Principal,
    Path(user_id): Path<i64>,
    Json(payload): Json<RiderStatusUpdate>,
) -> AppResult<Json<RiderProfile>> {
    let profile = service::update_status(&state, principal.user(), user_id, payload.status).await?;
    Ok(Json(profile))
}
