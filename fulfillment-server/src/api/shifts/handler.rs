//! Shift API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use shared::models::{ShiftEnd, ShiftReport, ShiftStart, StaffShift};

use crate::auth::Principal;
use crate::core::ServerState;
use crate::shifts::{ListShiftsQuery, service};
use crate::utils::AppResult;

/// GET /api/shifts - 班次历史
pub async fn list(
    State(state): State<ServerState>,
    principal: Principal,
    Query(query): Query<ListShiftsQuery>,
) -> AppResult<Json<Vec<StaffShift>>> {
    let shifts = service::list(&state, principal.user(), &query).await?;
    Ok(Json(shifts))
}

/// POST /api/shifts/start - 开班
pub async fn start(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<ShiftStart>,
) -> AppResult<(StatusCode, Json<StaffShift>)> {
    let shift = service::start(&state, principal.user(), payload).await?;
    Ok((StatusCode::CREATED, Json(shift)))
}

/// GET /api/shifts/current - 当前用户的进行中班次
pub async fn get_current(
    State(state): State<ServerState>,
    principal: Principal,
) -> AppResult<Json<StaffShift>> {
    let shift = service::current(&state, principal.user()).await?;
    Ok(Json(shift))
}

/// POST /api/shifts/end - 交班对账
pub async fn end(
    State(state): State<ServerState>,
    principal: Principal,
    Json(payload): Json<ShiftEnd>,
) -> AppResult<Json<StaffShift>> {
    let shift = service::end(&state, principal.user(), payload).await?;
    Ok(Json(shift))
}

/// GET /api/shifts/{id}/report
pub async fn report(
    State(state): State<ServerState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<ShiftReport>> {
    let report = service::report(&state, principal.user(), id).await?;
    Ok(Json(report))
}
