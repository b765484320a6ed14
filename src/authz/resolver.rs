use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::membership::MembershipRole;

/// Looks up the role a user holds on a project.
///
/// `Err(NotFound)` means the project does not exist; `Ok(None)` means it
/// exists and the user holds no membership on it. Callers must keep the two
/// apart.
#[async_trait]
pub trait MembershipResolver: Send + Sync {
    async fn role_of(&self, user_id: Uuid, project_id: Uuid) -> AppResult<Option<MembershipRole>>;
}

#[derive(Debug, Clone)]
pub struct SqliteMembershipResolver {
    pool: SqlitePool,
}

impl SqliteMembershipResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct StandingRow {
    role: Option<MembershipRole>,
}

#[async_trait]
impl MembershipResolver for SqliteMembershipResolver {
    async fn role_of(&self, user_id: Uuid, project_id: Uuid) -> AppResult<Option<MembershipRole>> {
        let row = sqlx::query_as::<_, StandingRow>(
            "SELECT m.role AS role
             FROM projects p
             LEFT JOIN project_memberships m ON m.project_id = p.id AND m.user_id = ?
             WHERE p.id = ?",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))?;

        Ok(row.role)
    }
}
