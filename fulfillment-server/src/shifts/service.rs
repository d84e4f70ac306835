//! Shift Service (班次现金对账)
//!
//! 开班记录备用金；交班时根据班次期间该员工经手的现金订单计算应收现金：
//!
//! ```text
//! expected = Σ total_amount (cash, not cancelled, created in [start, end))
//! variance = cash_sales_actual - expected
//! ```

use serde::Deserialize;
use shared::event::DomainEvent;
use shared::models::{Capability, ShiftEnd, ShiftReport, ShiftStart, ShiftStatus, StaffShift};

use crate::auth::CurrentUser;
use crate::auth::permissions::{authenticated, authorize, can_read_shift};
use crate::core::ServerState;
use crate::db::repository::shift::{self, ShiftClosing};
use crate::db::repository::{RepoError, order};
use crate::utils::validation::{MAX_NOTE_LEN, page_bounds, validate_optional_text};
use crate::utils::{AppError, AppResult, ErrorCode, money};

/// Query params for shift history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListShiftsQuery {
    /// Report viewers only; others always see their own shifts
    pub user_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Open a shift for the principal
pub async fn start(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    payload: ShiftStart,
) -> AppResult<StaffShift> {
    let user = authorize(principal, Capability::PerformShifts)?;
    money::validate_amount(payload.starting_cash, "starting_cash")?;
    validate_optional_text(&payload.note, "note", MAX_NOTE_LEN)?;

    if let Some(open) = shift::find_open_by_user(&state.pool, user.id).await? {
        return Err(already_open(user.id, open.id));
    }

    let opened = shift::create(
        &state.pool,
        user.id,
        money::round(payload.starting_cash),
        payload.note.as_deref(),
        shared::util::now_millis(),
    )
    .await
    .map_err(|e| match e {
        RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::ShiftAlreadyOpen, msg),
        other => other.into(),
    })?;

    tracing::info!(
        shift_id = opened.id,
        user_id = user.id,
        starting_cash = opened.starting_cash,
        "Shift opened"
    );
    state.events.emit(
        user.id,
        DomainEvent::ShiftOpened {
            shift_id: opened.id,
            user_id: user.id,
        },
    );
    Ok(opened)
}

/// The principal's open shift
pub async fn current(state: &ServerState, principal: Option<&CurrentUser>) -> AppResult<StaffShift> {
    let user = authenticated(principal)?;
    shift::find_open_by_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| no_open_shift(user.id))
}

/// Close the principal's open shift and reconcile cash
pub async fn end(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    payload: ShiftEnd,
) -> AppResult<StaffShift> {
    let user = authorize(principal, Capability::PerformShifts)?;
    money::validate_amount(payload.cash_sales_actual, "cash_sales_actual")?;
    validate_optional_text(&payload.note, "note", MAX_NOTE_LEN)?;

    let open = shift::find_open_by_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| no_open_shift(user.id))?;

    let end_time = shared::util::now_millis();
    let cash_sales =
        order::cash_totals_for_staff(&state.pool, user.id, open.start_time, end_time).await?;
    let expected_cash = money::sum(cash_sales);
    let cash_actual = money::round(payload.cash_sales_actual);
    let cash_variance = money::variance(cash_actual, expected_cash);

    let closing = ShiftClosing {
        end_time,
        cash_sales_actual: cash_actual,
        expected_cash,
        cash_variance,
        note: payload.note,
    };
    if !shift::close(&state.pool, open.id, &closing).await? {
        return Err(AppError::conflict(format!("Shift {} is already closed", open.id)));
    }

    tracing::info!(
        shift_id = open.id,
        user_id = user.id,
        expected_cash,
        cash_actual,
        cash_variance,
        "Shift closed"
    );
    if !money::matches(cash_variance, 0.0) {
        tracing::warn!(shift_id = open.id, cash_variance, "Cash variance at shift close");
    }
    state.events.emit(
        user.id,
        DomainEvent::ShiftClosed {
            shift_id: open.id,
            user_id: user.id,
            cash_variance,
        },
    );

    shift::find_by_id(&state.pool, open.id)
        .await?
        .ok_or_else(|| shift_not_found(open.id))
}

/// Cash summary of one shift (owner or report viewers)
///
/// Open shifts are reconciled up to now; closed shifts report what was
/// recorded at close.
pub async fn report(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    shift_id: i64,
) -> AppResult<ShiftReport> {
    let user = authenticated(principal)?;
    let found = shift::find_by_id(&state.pool, shift_id)
        .await?
        .ok_or_else(|| shift_not_found(shift_id))?;
    if !can_read_shift(user, &found) {
        authorize(Some(user), Capability::ViewReports)?;
    }

    let window_end = match (found.status, found.end_time) {
        (ShiftStatus::Closed, Some(end)) => end,
        _ => shared::util::now_millis(),
    };
    let cash_sales =
        order::cash_totals_for_staff(&state.pool, found.user_id, found.start_time, window_end)
            .await?;
    let cash_order_count = cash_sales.len() as i64;

    let (expected_cash, cash_variance) = match found.status {
        ShiftStatus::Closed => (
            found
                .expected_cash
                .unwrap_or_else(|| money::sum(cash_sales)),
            found.cash_variance,
        ),
        ShiftStatus::Open => (money::sum(cash_sales), None),
    };

    Ok(ShiftReport {
        shift: found,
        expected_cash,
        cash_variance,
        cash_order_count,
    })
}

/// Shift history, newest first
pub async fn list(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    query: &ListShiftsQuery,
) -> AppResult<Vec<StaffShift>> {
    let user = authenticated(principal)?;
    let (limit, offset) = page_bounds(query.limit, query.offset)?;

    let user_filter = if user.has(Capability::ViewReports) {
        query.user_id
    } else {
        if query.user_id.is_some_and(|id| id != user.id) {
            authorize(Some(user), Capability::ViewReports)?;
        }
        Some(user.id)
    };

    let shifts = shift::find_all(&state.pool, user_filter, limit, offset).await?;
    Ok(shifts)
}

fn already_open(user_id: i64, shift_id: i64) -> AppError {
    AppError::with_message(
        ErrorCode::ShiftAlreadyOpen,
        format!("User {user_id} already has an open shift"),
    )
    .with_detail("shift_id", shift_id)
}

fn no_open_shift(user_id: i64) -> AppError {
    AppError::with_message(
        ErrorCode::ShiftNotFound,
        format!("User {user_id} has no open shift"),
    )
}

fn shift_not_found(shift_id: i64) -> AppError {
    AppError::entity_not_found(ErrorCode::ShiftNotFound, "Shift", shift_id)
}
