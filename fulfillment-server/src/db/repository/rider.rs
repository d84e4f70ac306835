//! Rider Profile Repository

use super::order::TERMINAL_STATUSES;
use super::{RepoError, RepoResult};
use shared::models::{RiderProfile, RiderStatus};
use sqlx::{Acquire, Sqlite, SqliteExecutor};

const RIDER_COLUMNS: &str = "id, user_id, status, current_latitude, current_longitude, last_location_update, created_at, updated_at";

pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> RepoResult<Option<RiderProfile>> {
    let sql = format!("SELECT {RIDER_COLUMNS} FROM rider_profile WHERE id = ?");
    let profile = sqlx::query_as::<Sqlite, RiderProfile>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(profile)
}

pub async fn find_by_user<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
) -> RepoResult<Option<RiderProfile>> {
    let sql = format!("SELECT {RIDER_COLUMNS} FROM rider_profile WHERE user_id = ?");
    let profile = sqlx::query_as::<Sqlite, RiderProfile>(&sql)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    Ok(profile)
}

/// Get the user's profile, creating an `offline` one on first use
pub async fn ensure_for_user<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    user_id: i64,
) -> RepoResult<RiderProfile> {
    let mut conn = conn.acquire().await?;
    let now = shared::util::now_millis();

    // INSERT OR IGNORE: 并发首次访问时只有一个插入生效
    sqlx::query(
        "INSERT OR IGNORE INTO rider_profile (id, user_id, status, created_at, updated_at) VALUES (?1, ?2, 'offline', ?3, ?3)",
    )
    .bind(shared::util::snowflake_id())
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    find_by_user(&mut *conn, user_id)
        .await?
        .ok_or_else(|| RepoError::Database(format!("Failed to create rider profile for user {user_id}")))
}

/// Online riders with a known location (assignment candidates)
pub async fn find_available<'e>(executor: impl SqliteExecutor<'e>) -> RepoResult<Vec<RiderProfile>> {
    let sql = format!(
        "SELECT {RIDER_COLUMNS} FROM rider_profile WHERE status = 'online' AND current_latitude IS NOT NULL AND current_longitude IS NOT NULL"
    );
    let riders = sqlx::query_as::<Sqlite, RiderProfile>(&sql)
        .fetch_all(executor)
        .await?;
    Ok(riders)
}

/// Compare-and-swap the status; false when the row was not in `from`
pub async fn transition_status<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    from: RiderStatus,
    to: RiderStatus,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE rider_profile SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
    )
    .bind(to)
    .bind(shared::util::now_millis())
    .bind(id)
    .bind(from)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Flip `online → busy` only while the rider carries no other active order
pub async fn claim_idle<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    for_order: i64,
) -> RepoResult<bool> {
    let sql = format!(
        "UPDATE rider_profile SET status = 'busy', updated_at = ?1 WHERE id = ?2 AND status = 'online' AND NOT EXISTS (SELECT 1 FROM orders WHERE rider_id = ?2 AND id <> ?3 AND status NOT IN {TERMINAL_STATUSES})"
    );
    let rows = sqlx::query(&sql)
        .bind(shared::util::now_millis())
        .bind(id)
        .bind(for_order)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected() == 1)
}

/// Last write wins
pub async fn update_location<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    latitude: f64,
    longitude: f64,
    at: i64,
) -> RepoResult<()> {
    let rows = sqlx::query(
        "UPDATE rider_profile SET current_latitude = ?1, current_longitude = ?2, last_location_update = ?3, updated_at = ?3 WHERE id = ?4",
    )
    .bind(latitude)
    .bind(longitude)
    .bind(at)
    .bind(id)
    .execute(executor)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Rider {id} not found")));
    }
    Ok(())
}
