use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{hierarchy, resolver, tuples, Resource, ResourceType, Role};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthPrincipal;
use crate::models::folder::{Folder, FolderCreateRequest, FolderListQuery, FolderUpdateRequest, FolderWithPath};

#[utoipa::path(
    get,
    path = "/folders",
    tag = "Folders",
    params(FolderListQuery),
    responses((status = 200, description = "Child folders visible to the caller", body = [Folder]))
)]
pub async fn list_folders(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Query(query): Query<FolderListQuery>,
) -> AppResult<Json<Vec<Folder>>> {
    let mut conn = state.pool.acquire().await?;

    let candidates = hierarchy::child_folders(&mut conn, query.namespace_id, query.parent_folder_id).await?;

    let mut visible = Vec::with_capacity(candidates.len());
    for folder in candidates {
        if resolver::effective_role(&mut conn, auth.principal, Resource::folder(folder.id))
            .await?
            .is_some()
        {
            visible.push(folder);
        }
    }

    Ok(Json(visible))
}

#[utoipa::path(
    post,
    path = "/folders",
    tag = "Folders",
    request_body = FolderCreateRequest,
    responses(
        (status = 201, description = "Folder created; the caller owns it", body = Folder),
        (status = 403, description = "Caller is not an owner of the parent folder"),
        (status = 404, description = "Parent folder not found")
    )
)]
pub async fn create_folder(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Json(payload): Json<FolderCreateRequest>,
) -> AppResult<(StatusCode, Json<Folder>)> {
    let mut tx = state.pool.begin().await?;

    if let Some(parent_id) = payload.parent_folder_id {
        hierarchy::require_folder(&mut tx, parent_id).await?;
        resolver::require_role(&mut tx, auth.principal, Resource::folder(parent_id), Role::Owner).await?;
    }

    let folder =
        hierarchy::create_folder(&mut tx, payload.namespace_id, &payload.name, payload.parent_folder_id).await?;
    tuples::upsert(&mut tx, auth.principal, Resource::folder(folder.id), Role::Owner).await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(folder)))
}

#[utoipa::path(
    get,
    path = "/folders/{id}",
    tag = "Folders",
    params(("id" = Uuid, Path, description = "Folder id")),
    responses(
        (status = 200, description = "Folder with its root-first path", body = FolderWithPath),
        (status = 404, description = "Folder not found or not visible to the caller")
    )
)]
pub async fn get_folder(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<FolderWithPath>> {
    let mut conn = state.pool.acquire().await?;

    resolver::require_visible(&mut conn, auth.principal, Resource::folder(id)).await?;
    let folder = hierarchy::require_folder(&mut conn, id).await?;
    let path = hierarchy::folder_path(&mut conn, id).await?;

    Ok(Json(FolderWithPath { folder, path }))
}

#[utoipa::path(
    get,
    path = "/folders/{id}/path",
    tag = "Folders",
    params(("id" = Uuid, Path, description = "Folder id")),
    responses(
        (status = 200, description = "Folders from the root down to this one", body = [Folder]),
        (status = 404, description = "Folder not found or not visible to the caller")
    )
)]
pub async fn get_folder_path(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Folder>>> {
    let mut conn = state.pool.acquire().await?;

    resolver::require_visible(&mut conn, auth.principal, Resource::folder(id)).await?;
    let path = hierarchy::folder_path(&mut conn, id).await?;

    Ok(Json(path))
}

#[utoipa::path(
    patch,
    path = "/folders/{id}",
    tag = "Folders",
    params(("id" = Uuid, Path, description = "Folder id")),
    request_body = FolderUpdateRequest,
    responses(
        (status = 200, description = "Folder renamed and/or moved", body = Folder),
        (status = 400, description = "Invalid move, including one that would create a cycle"),
        (status = 403, description = "Caller does not own the folder or the new parent"),
        (status = 404, description = "Folder or new parent not found")
    )
)]
pub async fn update_folder(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<FolderUpdateRequest>,
) -> AppResult<Json<Folder>> {
    if payload.detach && payload.parent_folder_id.is_some() {
        return Err(AppError::invalid_argument("use either parent_folder_id or detach, not both"));
    }

    let mut tx = state.pool.begin().await?;

    let mut folder = hierarchy::require_folder(&mut tx, id).await?;
    resolver::require_role(&mut tx, auth.principal, Resource::folder(id), Role::Owner).await?;

    if let Some(name) = payload.name.as_deref() {
        folder = hierarchy::rename_folder(&mut tx, id, name).await?;
    }

    if let Some(parent_id) = payload.parent_folder_id {
        if parent_id != id {
            hierarchy::require_folder(&mut tx, parent_id).await?;
            resolver::require_role(&mut tx, auth.principal, Resource::folder(parent_id), Role::Owner).await?;
        }
        folder = hierarchy::move_folder(&mut tx, id, Some(parent_id)).await?;
    } else if payload.detach {
        folder = hierarchy::move_folder(&mut tx, id, None).await?;
    }

    tx.commit().await?;

    Ok(Json(folder))
}

#[utoipa::path(
    delete,
    path = "/folders/{id}",
    tag = "Folders",
    params(("id" = Uuid, Path, description = "Folder id")),
    responses(
        (status = 204, description = "Folder, its subfolders, contained workflows and their grants deleted"),
        (status = 403, description = "Caller is not an owner of the folder"),
        (status = 404, description = "Folder not found")
    )
)]
pub async fn delete_folder(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut tx = state.pool.begin().await?;

    hierarchy::require_folder(&mut tx, id).await?;
    resolver::require_role(&mut tx, auth.principal, Resource::folder(id), Role::Owner).await?;

    let removed = hierarchy::delete_folder_tree(&mut tx, id).await?;
    tuples::delete_for_resources(&mut tx, ResourceType::Workflow, &removed.workflows).await?;
    tuples::delete_for_resources(&mut tx, ResourceType::Folder, &removed.folders).await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
