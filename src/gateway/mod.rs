//! Resource gateway: the five operations every project-owned resource
//! supports, written once and driven by a [`ProjectResource`] descriptor.
//!
//! Every operation resolves the parent project first (404), then asks the
//! policy (403), and only then touches the resource table. A denied call
//! never writes.

pub mod memberships;
pub mod projects;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::authz::{Action, Principal, ProjectAccess, ResourceKind};
use crate::errors::{AppError, AppResult};

/// Descriptor of a child entity owned by exactly one project.
#[async_trait]
pub trait ProjectResource: Serialize + Sized + Send + Sync + Unpin + 'static {
    const KIND: ResourceKind;
    const TABLE: &'static str;
    /// Column list selected into [`ProjectResource::Row`].
    const COLUMNS: &'static str;
    const ORDER_BY: &'static str = "created_at ASC";

    type Row: for<'r> FromRow<'r, SqliteRow> + Send + Unpin;
    type Create: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;

    fn from_row(row: Self::Row) -> AppResult<Self>;

    /// Builds a validated, not yet persisted resource.
    fn build(project_id: Uuid, payload: Self::Create) -> AppResult<Self>;

    /// Applies a partial update and re-validates.
    fn apply(&mut self, payload: Self::Update) -> AppResult<()>;

    /// Fills in data kept outside the resource's own table (e.g. task
    /// assignees). All `items` belong to `project_id`.
    async fn load_related(_items: &mut [Self], _conn: &mut SqliteConnection, _project_id: Uuid) -> AppResult<()> {
        Ok(())
    }

    /// Checks references to other rows (e.g. assignees) before writing. Runs
    /// in the same transaction as the write.
    async fn check_references(&self, _conn: &mut SqliteConnection) -> AppResult<()> {
        Ok(())
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error>;

    async fn save(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error>;

    /// Message used when a write trips a uniqueness constraint.
    fn conflict_message(&self) -> String {
        format!("{} already exists", Self::KIND)
    }
}

pub async fn list<R: ProjectResource>(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
) -> AppResult<Vec<R>> {
    access.authorize(principal, Action::Read, R::KIND, project_id).await?;

    let sql = format!(
        "SELECT {} FROM {} WHERE project_id = ? ORDER BY {}",
        R::COLUMNS,
        R::TABLE,
        R::ORDER_BY
    );
    let mut conn = pool.acquire().await?;
    let rows = sqlx::query_as::<_, R::Row>(&sql)
        .bind(project_id)
        .fetch_all(&mut *conn)
        .await?;

    let mut items = rows.into_iter().map(R::from_row).collect::<AppResult<Vec<R>>>()?;
    R::load_related(&mut items, &mut conn, project_id).await?;
    Ok(items)
}

pub async fn create<R: ProjectResource>(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
    payload: R::Create,
) -> AppResult<R> {
    access.authorize(principal, Action::Create, R::KIND, project_id).await?;

    let resource = R::build(project_id, payload)?;

    let mut tx = pool.begin().await?;
    resource.check_references(&mut tx).await?;
    resource
        .insert(&mut tx)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, resource.conflict_message()))?;
    tx.commit().await?;

    tracing::info!(user_id = %principal.user_id, project_id = %project_id, kind = %R::KIND, "resource created");
    Ok(resource)
}

pub async fn retrieve<R: ProjectResource>(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
    resource_id: Uuid,
) -> AppResult<R> {
    access.authorize(principal, Action::Read, R::KIND, project_id).await?;

    let mut conn = pool.acquire().await?;
    fetch_scoped::<R>(&mut conn, project_id, resource_id).await
}

pub async fn update<R: ProjectResource>(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
    resource_id: Uuid,
    payload: R::Update,
) -> AppResult<R> {
    access.authorize(principal, Action::Update, R::KIND, project_id).await?;

    let mut tx = pool.begin().await?;
    let mut resource = fetch_scoped::<R>(&mut tx, project_id, resource_id).await?;
    resource.apply(payload)?;
    resource.check_references(&mut tx).await?;
    resource
        .save(&mut tx)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, resource.conflict_message()))?;
    tx.commit().await?;

    tracing::info!(user_id = %principal.user_id, project_id = %project_id, kind = %R::KIND, resource_id = %resource_id, "resource updated");
    Ok(resource)
}

pub async fn delete<R: ProjectResource>(
    pool: &SqlitePool,
    access: &ProjectAccess,
    principal: &Principal,
    project_id: Uuid,
    resource_id: Uuid,
) -> AppResult<()> {
    access.authorize(principal, Action::Delete, R::KIND, project_id).await?;

    let sql = format!("DELETE FROM {} WHERE id = ? AND project_id = ?", R::TABLE);
    let affected = sqlx::query(&sql)
        .bind(resource_id)
        .bind(project_id)
        .execute(pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found(format!("{} not found", R::KIND)));
    }

    tracing::info!(user_id = %principal.user_id, project_id = %project_id, kind = %R::KIND, resource_id = %resource_id, "resource deleted");
    Ok(())
}

/// Fetches a resource only if it belongs to `project_id`; a row under another
/// project is reported exactly like a missing one.
async fn fetch_scoped<R: ProjectResource>(
    conn: &mut SqliteConnection,
    project_id: Uuid,
    resource_id: Uuid,
) -> AppResult<R> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ? AND project_id = ?",
        R::COLUMNS,
        R::TABLE
    );
    let row = sqlx::query_as::<_, R::Row>(&sql)
        .bind(resource_id)
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", R::KIND)))?;

    let mut items = [R::from_row(row)?];
    R::load_related(&mut items, conn, project_id).await?;
    let [resource] = items;
    Ok(resource)
}
