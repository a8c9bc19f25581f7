use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{hierarchy, resolver, tuples, Resource, ResourceType, Role};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthPrincipal;
use crate::models::workflow::{Workflow, WorkflowCreateRequest, WorkflowMoveRequest};

#[utoipa::path(
    post,
    path = "/workflows",
    tag = "Workflows",
    request_body = WorkflowCreateRequest,
    responses(
        (status = 201, description = "Workflow created; the caller owns it", body = Workflow),
        (status = 403, description = "Caller is not an owner of the parent folder"),
        (status = 404, description = "Parent folder not found")
    )
)]
pub async fn create_workflow(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Json(payload): Json<WorkflowCreateRequest>,
) -> AppResult<(StatusCode, Json<Workflow>)> {
    let mut tx = state.pool.begin().await?;

    if let Some(parent_id) = payload.parent_folder_id {
        hierarchy::require_folder(&mut tx, parent_id).await?;
        resolver::require_role(&mut tx, auth.principal, Resource::folder(parent_id), Role::Owner).await?;
    }

    let workflow =
        hierarchy::create_workflow(&mut tx, payload.namespace_id, &payload.name, payload.parent_folder_id).await?;
    tuples::upsert(&mut tx, auth.principal, Resource::workflow(workflow.id), Role::Owner).await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(workflow)))
}

#[utoipa::path(
    get,
    path = "/workflows/{id}",
    tag = "Workflows",
    params(("id" = Uuid, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Workflow detail", body = Workflow),
        (status = 404, description = "Workflow not found or not visible to the caller")
    )
)]
pub async fn get_workflow(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Workflow>> {
    let mut conn = state.pool.acquire().await?;

    resolver::require_visible(&mut conn, auth.principal, Resource::workflow(id)).await?;
    let workflow = hierarchy::require_workflow(&mut conn, id).await?;

    Ok(Json(workflow))
}

#[utoipa::path(
    patch,
    path = "/workflows/{id}",
    tag = "Workflows",
    params(("id" = Uuid, Path, description = "Workflow id")),
    request_body = WorkflowMoveRequest,
    responses(
        (status = 200, description = "Workflow moved, or unchanged when neither field is set", body = Workflow),
        (status = 400, description = "Target folder is in another namespace, or both fields are set"),
        (status = 403, description = "Caller does not own the workflow or the target folder"),
        (status = 404, description = "Workflow or target folder not found")
    )
)]
pub async fn move_workflow(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<WorkflowMoveRequest>,
) -> AppResult<Json<Workflow>> {
    if payload.detach && payload.parent_folder_id.is_some() {
        return Err(AppError::invalid_argument("use either parent_folder_id or detach, not both"));
    }

    let mut tx = state.pool.begin().await?;

    let mut workflow = hierarchy::require_workflow(&mut tx, id).await?;
    resolver::require_role(&mut tx, auth.principal, Resource::workflow(id), Role::Owner).await?;

    if let Some(parent_id) = payload.parent_folder_id {
        hierarchy::require_folder(&mut tx, parent_id).await?;
        resolver::require_role(&mut tx, auth.principal, Resource::folder(parent_id), Role::Owner).await?;
        workflow = hierarchy::move_workflow(&mut tx, id, Some(parent_id)).await?;
    } else if payload.detach {
        workflow = hierarchy::move_workflow(&mut tx, id, None).await?;
    }

    tx.commit().await?;

    Ok(Json(workflow))
}

#[utoipa::path(
    delete,
    path = "/workflows/{id}",
    tag = "Workflows",
    params(("id" = Uuid, Path, description = "Workflow id")),
    responses(
        (status = 204, description = "Workflow and its grants deleted"),
        (status = 403, description = "Caller is not an owner of the workflow"),
        (status = 404, description = "Workflow not found")
    )
)]
pub async fn delete_workflow(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut tx = state.pool.begin().await?;

    hierarchy::require_workflow(&mut tx, id).await?;
    resolver::require_role(&mut tx, auth.principal, Resource::workflow(id), Role::Owner).await?;

    hierarchy::delete_workflow(&mut tx, id).await?;
    tuples::delete_for_resources(&mut tx, ResourceType::Workflow, &[id]).await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
