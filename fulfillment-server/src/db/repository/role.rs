//! Role Repository

use super::RepoResult;
use shared::models::Role;
use sqlx::{Sqlite, SqliteExecutor};

const ROLE_COLUMNS: &str = "id, name, description, capabilities, is_system, is_active";

pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> RepoResult<Option<Role>> {
    let sql = format!("SELECT {ROLE_COLUMNS} FROM role WHERE id = ?");
    let role = sqlx::query_as::<Sqlite, Role>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(role)
}

pub async fn find_by_name<'e>(
    executor: impl SqliteExecutor<'e>,
    name: &str,
) -> RepoResult<Option<Role>> {
    let sql = format!("SELECT {ROLE_COLUMNS} FROM role WHERE name = ?");
    let role = sqlx::query_as::<Sqlite, Role>(&sql)
        .bind(name)
        .fetch_optional(executor)
        .await?;
    Ok(role)
}

pub async fn find_all<'e>(executor: impl SqliteExecutor<'e>) -> RepoResult<Vec<Role>> {
    let sql = format!("SELECT {ROLE_COLUMNS} FROM role ORDER BY id");
    let roles = sqlx::query_as::<Sqlite, Role>(&sql)
        .fetch_all(executor)
        .await?;
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::models::Capability;

    #[tokio::test]
    async fn test_seeded_roles_carry_capabilities() {
        let db = DbService::in_memory().await.unwrap();

        let roles = find_all(&db.pool).await.unwrap();
        let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["admin", "manager", "staff", "rider", "customer"]);

        let admin = find_by_name(&db.pool, "admin").await.unwrap().unwrap();
        assert!(Capability::ALL.iter().all(|c| admin.grants(*c)));

        let rider = find_by_name(&db.pool, "rider").await.unwrap().unwrap();
        assert_eq!(rider.capabilities, vec![Capability::PerformDelivery]);
        assert!(!rider.grants(Capability::EditOrders));

        let staff = find_by_id(&db.pool, 3).await.unwrap().unwrap();
        assert!(staff.grants(Capability::PerformShifts));
        assert!(!staff.grants(Capability::ViewReports));
    }

    #[tokio::test]
    async fn test_seeded_roles_match_default_capabilities() {
        let db = DbService::in_memory().await.unwrap();
        for role in find_all(&db.pool).await.unwrap() {
            assert!(role.is_system);
            assert_eq!(
                role.capabilities,
                crate::auth::permissions::default_capabilities(&role.name),
                "role {}",
                role.name
            );
        }
    }

    #[tokio::test]
    async fn test_deactivated_role_grants_nothing() {
        let db = DbService::in_memory().await.unwrap();
        sqlx::query("UPDATE role SET is_active = 0 WHERE name = 'staff'")
            .execute(&db.pool)
            .await
            .unwrap();

        let staff = find_by_name(&db.pool, "staff").await.unwrap().unwrap();
        assert!(!staff.grants(Capability::PlaceOrders));
    }
}
