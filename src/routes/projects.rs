use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppResult;
use crate::extract::ValidatedJson;
use crate::gateway::projects;
use crate::models::project::{Project, ProjectCreateRequest, ProjectUpdateRequest};

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    responses((status = 200, description = "Projects visible to the caller", body = [Project]))
)]
pub async fn list_projects(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Project>>> {
    let projects = projects::list_visible(&state.pool, &principal).await?;
    Ok(Json(projects))
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    request_body = ProjectCreateRequest,
    responses(
        (status = 201, description = "Project created; the caller becomes its leader", body = Project),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller lacks the leader capability")
    )
)]
pub async fn create_project(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(payload): ValidatedJson<ProjectCreateRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = projects::create(&state.pool, &state.access, &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}",
    tag = "Projects",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project detail", body = Project),
        (status = 403, description = "No access to this project"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    principal: Principal,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let project = projects::retrieve(&state.pool, &state.access, &principal, project_id).await?;
    Ok(Json(project))
}

#[utoipa::path(
    put,
    path = "/projects/{project_id}",
    tag = "Projects",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses(
        (status = 200, description = "Project updated", body = Project),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller is not a leader of this project"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn update_project(
    State(state): State<AppState>,
    principal: Principal,
    Path(project_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ProjectUpdateRequest>,
) -> AppResult<Json<Project>> {
    let project = projects::update(&state.pool, &state.access, &principal, project_id, payload).await?;
    Ok(Json(project))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}",
    tag = "Projects",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project and everything it owns deleted"),
        (status = 403, description = "Caller is not a leader of this project"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn delete_project(
    State(state): State<AppState>,
    principal: Principal,
    Path(project_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    projects::delete(&state.pool, &state.access, &principal, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
