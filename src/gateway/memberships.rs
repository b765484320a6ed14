use sqlx::{Executor, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::authz::{Action, Principal, ProjectAccess, ResourceKind};
use crate::errors::{AppError, AppResult};
use crate::models::membership::{
    Membership, MembershipCreateRequest, MembershipRole, MembershipUpdateRequest, MEMBERSHIP_COLUMNS,
};
use crate::utils::utc_now;

const KIND: ResourceKind = ResourceKind::Membership;

pub async fn list(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
) -> AppResult<Vec<Membership>> {
    access.authorize(principal, Action::Read, KIND, project_id).await?;

    let sql = format!("SELECT {MEMBERSHIP_COLUMNS} FROM project_memberships WHERE project_id = ? ORDER BY date_added ASC");
    let members = sqlx::query_as::<_, Membership>(&sql)
        .bind(project_id)
        .fetch_all(pool)
        .await?;

    Ok(members)
}

/// Adds `payload.user_id` to the project. The grantee's account flags must
/// admit the requested role; a second membership for the same user is a
/// conflict.
pub async fn add(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
    payload: MembershipCreateRequest,
) -> AppResult<Membership> {
    access.authorize(principal, Action::Create, KIND, project_id).await?;

    ensure_role_admitted(pool, payload.user_id, payload.role).await?;

    let membership = Membership::new(project_id, payload.user_id, payload.role, utc_now());
    sqlx::query("INSERT INTO project_memberships (id, project_id, user_id, role, date_added) VALUES (?, ?, ?, ?, ?)")
        .bind(membership.id)
        .bind(membership.project_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(membership.date_added)
        .execute(pool)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, "user is already a member of this project"))?;

    tracing::info!(
        user_id = %principal.user_id,
        project_id = %project_id,
        member_id = %membership.user_id,
        role = %membership.role,
        "membership granted"
    );
    Ok(membership)
}

pub async fn retrieve(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
    member_id: Uuid,
) -> AppResult<Membership> {
    access.authorize(principal, Action::Read, KIND, project_id).await?;

    let sql = format!("SELECT {MEMBERSHIP_COLUMNS} FROM project_memberships WHERE project_id = ? AND user_id = ?");
    sqlx::query_as::<_, Membership>(&sql)
        .bind(project_id)
        .bind(member_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("membership not found"))
}

pub async fn change_role(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
    member_id: Uuid,
    payload: MembershipUpdateRequest,
) -> AppResult<Membership> {
    access.authorize(principal, Action::Update, KIND, project_id).await?;

    let mut tx = pool.begin().await?;
    let mut membership = fetch_for_update(&mut tx, project_id, member_id).await?;

    if membership.role == payload.role {
        tx.commit().await?;
        return Ok(membership);
    }

    if membership.role == MembershipRole::Leader {
        ensure_not_last_leader(&mut tx, project_id).await?;
    }
    ensure_role_admitted(&mut *tx, member_id, payload.role).await?;

    sqlx::query("UPDATE project_memberships SET role = ? WHERE id = ?")
        .bind(payload.role)
        .bind(membership.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %principal.user_id,
        project_id = %project_id,
        member_id = %member_id,
        from = %membership.role,
        to = %payload.role,
        "membership role changed"
    );
    membership.role = payload.role;
    Ok(membership)
}

pub async fn remove(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
    member_id: Uuid,
) -> AppResult<()> {
    access.authorize(principal, Action::Delete, KIND, project_id).await?;

    let mut tx = pool.begin().await?;
    let membership = fetch_for_update(&mut tx, project_id, member_id).await?;

    if membership.role == MembershipRole::Leader {
        ensure_not_last_leader(&mut tx, project_id).await?;
    }

    sqlx::query("DELETE FROM project_memberships WHERE id = ?")
        .bind(membership.id)
        .execute(&mut *tx)
        .await?;
    // a former member cannot stay assigned to the project's tasks
    let unassigned = sqlx::query(
        "DELETE FROM task_assignees WHERE user_id = ? AND task_id IN (SELECT id FROM tasks WHERE project_id = ?)",
    )
    .bind(member_id)
    .bind(project_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;

    tracing::info!(
        user_id = %principal.user_id,
        project_id = %project_id,
        member_id = %member_id,
        unassigned,
        "membership revoked"
    );
    Ok(())
}

async fn fetch_for_update(
    tx: &mut Transaction<'_, Sqlite>,
    project_id: Uuid,
    member_id: Uuid,
) -> AppResult<Membership> {
    let sql = format!("SELECT {MEMBERSHIP_COLUMNS} FROM project_memberships WHERE project_id = ? AND user_id = ?");
    sqlx::query_as::<_, Membership>(&sql)
        .bind(project_id)
        .bind(member_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found("membership not found"))
}

/// A project must always keep at least one leader.
async fn ensure_not_last_leader(tx: &mut Transaction<'_, Sqlite>, project_id: Uuid) -> AppResult<()> {
    let leaders: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM project_memberships WHERE project_id = ? AND role = 'leader'",
    )
    .bind(project_id)
    .fetch_one(&mut **tx)
    .await?;

    if leaders <= 1 {
        return Err(AppError::conflict("a project must keep at least one leader"));
    }
    Ok(())
}

async fn ensure_role_admitted<'e, E>(executor: E, user_id: Uuid, role: MembershipRole) -> AppResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let grantee = Principal::load(executor, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    if role.admits(&grantee.flags) {
        Ok(())
    } else {
        Err(AppError::validation(
            "role",
            format!("user's account flags do not permit the {role} role"),
        ))
    }
}
