//! Handlers shared by every project-owned collection (tasks, budgets, risks,
//! results). Each is instantiated once per [`ProjectResource`] in the router.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppResult;
use crate::extract::ValidatedJson;
use crate::gateway::{self, ProjectResource};

/// Routes for one collection, meant to be nested under
/// `/projects/:project_id/<collection>`.
pub fn routes<R: ProjectResource>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/:id", get(retrieve::<R>).put(update::<R>).delete(remove::<R>))
}

pub async fn list<R: ProjectResource>(
    State(state): State<AppState>,
    principal: Principal,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<R>>> {
    let items = gateway::list::<R>(&state.pool, &state.access, &principal, project_id).await?;
    Ok(Json(items))
}

pub async fn create<R: ProjectResource>(
    State(state): State<AppState>,
    principal: Principal,
    Path(project_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<R::Create>,
) -> AppResult<(StatusCode, Json<R>)> {
    let item = gateway::create::<R>(&state.pool, &state.access, &principal, project_id, payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn retrieve<R: ProjectResource>(
    State(state): State<AppState>,
    principal: Principal,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<R>> {
    let item = gateway::retrieve::<R>(&state.pool, &state.access, &principal, project_id, id).await?;
    Ok(Json(item))
}

pub async fn update<R: ProjectResource>(
    State(state): State<AppState>,
    principal: Principal,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<R::Update>,
) -> AppResult<Json<R>> {
    let item = gateway::update::<R>(&state.pool, &state.access, &principal, project_id, id, payload).await?;
    Ok(Json(item))
}

pub async fn remove<R: ProjectResource>(
    State(state): State<AppState>,
    principal: Principal,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    gateway::delete::<R>(&state.pool, &state.access, &principal, project_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
