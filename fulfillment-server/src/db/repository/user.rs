//! User Repository
//!
//! Users belong to the identity layer; the core reads them to resolve a
//! principal's role. `create` exists for bootstrapping and tests.

use super::{RepoError, RepoResult, role};
use shared::models::{Role, User};
use sqlx::{Acquire, Sqlite, SqliteExecutor};

const USER_COLUMNS: &str = "id, username, display_name, role_id, is_active";

pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> RepoResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = ?");
    let user = sqlx::query_as::<Sqlite, User>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

/// User together with its role (None when unassigned or dangling)
pub async fn find_with_role<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<(User, Option<Role>)>> {
    let mut conn = conn.acquire().await?;
    let Some(user) = find_by_id(&mut *conn, id).await? else {
        return Ok(None);
    };
    let role = match user.role_id {
        Some(role_id) => role::find_by_id(&mut *conn, role_id).await?,
        None => None,
    };
    Ok(Some((user, role)))
}

/// Insert a user bound to a role by name
pub async fn create<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    username: &str,
    display_name: &str,
    role_name: Option<&str>,
) -> RepoResult<User> {
    let mut conn = conn.acquire().await?;
    let role_id = match role_name {
        Some(name) => Some(
            role::find_by_name(&mut *conn, name)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("Role {name} not found")))?
                .id,
        ),
        None => None,
    };

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO app_user (id, username, display_name, role_id, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
    )
    .bind(id)
    .bind(username)
    .bind(display_name)
    .bind(role_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    find_by_id(&mut *conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

pub async fn set_active<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    is_active: bool,
) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE app_user SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(is_active)
        .bind(shared::util::now_millis())
        .bind(id)
        .execute(executor)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    Ok(())
}
