//! Staff Shift Repository

use super::{RepoError, RepoResult};
use shared::models::StaffShift;
use sqlx::{Acquire, Sqlite, SqliteExecutor};

const SHIFT_COLUMNS: &str = "id, user_id, status, start_time, end_time, starting_cash, cash_sales_actual, expected_cash, cash_variance, note, created_at, updated_at";

/// Values written when a shift is closed
#[derive(Debug, Clone)]
pub struct ShiftClosing {
    pub end_time: i64,
    pub cash_sales_actual: f64,
    pub expected_cash: f64,
    pub cash_variance: f64,
    pub note: Option<String>,
}

pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> RepoResult<Option<StaffShift>> {
    let sql = format!("SELECT {SHIFT_COLUMNS} FROM staff_shift WHERE id = ?");
    let shift = sqlx::query_as::<Sqlite, StaffShift>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(shift)
}

pub async fn find_open_by_user<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
) -> RepoResult<Option<StaffShift>> {
    let sql = format!("SELECT {SHIFT_COLUMNS} FROM staff_shift WHERE user_id = ? AND status = 'open'");
    let shift = sqlx::query_as::<Sqlite, StaffShift>(&sql)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    Ok(shift)
}

/// Shift history, newest first. `user_id = None` lists every user.
pub async fn find_all<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<StaffShift>> {
    let sql = format!(
        "SELECT {SHIFT_COLUMNS} FROM staff_shift WHERE (?1 IS NULL OR user_id = ?1) ORDER BY start_time DESC, id DESC LIMIT ?2 OFFSET ?3"
    );
    let shifts = sqlx::query_as::<Sqlite, StaffShift>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;
    Ok(shifts)
}

/// Open a shift
///
/// The partial unique index on open shifts turns a concurrent second start
/// into [`RepoError::Duplicate`].
pub async fn create<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    user_id: i64,
    starting_cash: f64,
    note: Option<&str>,
    start_time: i64,
) -> RepoResult<StaffShift> {
    let mut conn = conn.acquire().await?;
    let id = shared::util::snowflake_id();

    sqlx::query(
        "INSERT INTO staff_shift (id, user_id, status, start_time, starting_cash, note, created_at, updated_at) VALUES (?1, ?2, 'open', ?3, ?4, ?5, ?3, ?3)",
    )
    .bind(id)
    .bind(user_id)
    .bind(start_time)
    .bind(starting_cash)
    .bind(note)
    .execute(&mut *conn)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("User {user_id} already has an open shift"))
        }
        other => other,
    })?;

    find_by_id(&mut *conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create shift".into()))
}

/// Close an open shift; false when it was already closed
pub async fn close<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    closing: &ShiftClosing,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE staff_shift SET status = 'closed', end_time = ?1, cash_sales_actual = ?2, expected_cash = ?3, cash_variance = ?4, note = COALESCE(?5, note), updated_at = ?1 WHERE id = ?6 AND status = 'open'",
    )
    .bind(closing.end_time)
    .bind(closing.cash_sales_actual)
    .bind(closing.expected_cash)
    .bind(closing.cash_variance)
    .bind(&closing.note)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() == 1)
}
