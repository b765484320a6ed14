use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{Action, Principal, ProjectAccess, ResourceKind};
use crate::errors::{AppError, AppResult};
use crate::models::membership::{Membership, MembershipRole};
use crate::models::project::{Project, ProjectCreateRequest, ProjectUpdateRequest, PROJECT_COLUMNS};
use crate::utils::utc_now;

/// Projects the caller can see: every project for a manager, otherwise the
/// projects the caller holds any membership on.
pub async fn list_visible(pool: &SqlitePool, principal: &Principal) -> AppResult<Vec<Project>> {
    let projects = if principal.is_manager() {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC");
        sqlx::query_as::<_, Project>(&sql).fetch_all(pool).await?
    } else {
        let sql = format!(
            "SELECT {} FROM projects p
             WHERE EXISTS (SELECT 1 FROM project_memberships m WHERE m.project_id = p.id AND m.user_id = ?)
             ORDER BY p.created_at DESC",
            qualified_columns("p")
        );
        sqlx::query_as::<_, Project>(&sql)
            .bind(principal.user_id)
            .fetch_all(pool)
            .await?
    };

    Ok(projects)
}

/// Creates the project and the creator's `leader` membership in one
/// transaction: either both rows are committed or neither is.
pub async fn create(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    payload: ProjectCreateRequest,
) -> AppResult<Project> {
    access.authorize_project_create(principal)?;

    let now = utc_now();
    let project = Project::build(payload, now)?;
    let membership = Membership::new(project.id, principal.user_id, MembershipRole::Leader, now);

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO projects (id, name, client, curator, purpose, description, start_date, end_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(project.id)
    .bind(&project.name)
    .bind(&project.client)
    .bind(&project.curator)
    .bind(&project.purpose)
    .bind(&project.description)
    .bind(project.start_date)
    .bind(project.end_date)
    .bind(project.created_at)
    .bind(project.updated_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO project_memberships (id, project_id, user_id, role, date_added) VALUES (?, ?, ?, ?, ?)")
        .bind(membership.id)
        .bind(membership.project_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(membership.date_added)
        .execute(&mut *tx)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, "membership already exists"))?;

    tx.commit().await?;

    tracing::info!(user_id = %principal.user_id, project_id = %project.id, "project created");
    Ok(project)
}

pub async fn retrieve(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
) -> AppResult<Project> {
    access
        .authorize(principal, Action::Read, ResourceKind::Project, project_id)
        .await?;
    fetch_project(pool, project_id).await
}

pub async fn update(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
    payload: ProjectUpdateRequest,
) -> AppResult<Project> {
    access
        .authorize(principal, Action::Update, ResourceKind::Project, project_id)
        .await?;

    let mut project = fetch_project(pool, project_id).await?;
    project.apply(payload)?;
    project.updated_at = utc_now();

    sqlx::query(
        "UPDATE projects SET name = ?, client = ?, curator = ?, purpose = ?, description = ?, start_date = ?, end_date = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(&project.name)
    .bind(&project.client)
    .bind(&project.curator)
    .bind(&project.purpose)
    .bind(&project.description)
    .bind(project.start_date)
    .bind(project.end_date)
    .bind(project.updated_at)
    .bind(project.id)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %principal.user_id, project_id = %project_id, "project updated");
    Ok(project)
}

/// Hard delete; tasks, budgets, risks, results and memberships go with the
/// project through `ON DELETE CASCADE`.
pub async fn delete(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
) -> AppResult<()> {
    access
        .authorize(principal, Action::Delete, ResourceKind::Project, project_id)
        .await?;

    let affected = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(project_id)
        .execute(pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("project not found"));
    }

    tracing::info!(user_id = %principal.user_id, project_id = %project_id, "project deleted");
    Ok(())
}

async fn fetch_project(pool: &SqlitePool, project_id: Uuid) -> AppResult<Project> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?");
    sqlx::query_as::<_, Project>(&sql)
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))
}

fn qualified_columns(alias: &str) -> String {
    PROJECT_COLUMNS
        .split(", ")
        .map(|column| format!("{alias}.{column} AS {column}"))
        .collect::<Vec<_>>()
        .join(", ")
}
