use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppResult;
use crate::extract::ValidatedJson;
use crate::gateway::memberships;
use crate::models::membership::{Membership, MembershipCreateRequest, MembershipUpdateRequest};

#[utoipa::path(
    get,
    path = "/projects/{project_id}/members",
    tag = "Members",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project members", body = [Membership]),
        (status = 403, description = "No access to this project"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    principal: Principal,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<Membership>>> {
    let members = memberships::list(&state.pool, &state.access, &principal, project_id).await?;
    Ok(Json(members))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/members",
    tag = "Members",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = MembershipCreateRequest,
    responses(
        (status = 201, description = "Member added", body = Membership),
        (status = 400, description = "Role not permitted by the user's account flags"),
        (status = 403, description = "Caller is not a leader of this project"),
        (status = 404, description = "Project or user not found"),
        (status = 409, description = "User is already a member")
    )
)]
pub async fn add_member(
    State(state): State<AppState>,
    principal: Principal,
    Path(project_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<MembershipCreateRequest>,
) -> AppResult<(StatusCode, Json<Membership>)> {
    let membership = memberships::add(&state.pool, &state.access, &principal, project_id, payload).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/members/{user_id}",
    tag = "Members",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("user_id" = Uuid, Path, description = "Member's user id")
    ),
    responses(
        (status = 200, description = "Membership detail", body = Membership),
        (status = 403, description = "No access to this project"),
        (status = 404, description = "Project or membership not found")
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    principal: Principal,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Membership>> {
    let membership = memberships::retrieve(&state.pool, &state.access, &principal, project_id, user_id).await?;
    Ok(Json(membership))
}

#[utoipa::path(
    put,
    path = "/projects/{project_id}/members/{user_id}",
    tag = "Members",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("user_id" = Uuid, Path, description = "Member's user id")
    ),
    request_body = MembershipUpdateRequest,
    responses(
        (status = 200, description = "Role changed", body = Membership),
        (status = 400, description = "Role not permitted by the user's account flags"),
        (status = 403, description = "Caller is not a leader of this project"),
        (status = 404, description = "Project or membership not found"),
        (status = 409, description = "Would leave the project without a leader")
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    principal: Principal,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<MembershipUpdateRequest>,
) -> AppResult<Json<Membership>> {
    let membership =
        memberships::change_role(&state.pool, &state.access, &principal, project_id, user_id, payload).await?;
    Ok(Json(membership))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/members/{user_id}",
    tag = "Members",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("user_id" = Uuid, Path, description = "Member's user id")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 403, description = "Caller is not a leader of this project"),
        (status = 404, description = "Project or membership not found"),
        (status = 409, description = "Would leave the project without a leader")
    )
)]
pub async fn remove_member(
    State(state): State<AppState>,
    principal: Principal,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    memberships::remove(&state.pool, &state.access, &principal, project_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
