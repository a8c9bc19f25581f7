use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{enumerator, grants, lookup, resolver, Principal, PrincipalType, Resource};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthPrincipal;
use crate::models::access::{
    AccessGrantRequest, AccessRevokeQuery, AccessRoleUpdateRequest, AccessibleResourcesQuery,
    EffectiveRoleQuery, EffectiveRoleResponse, ResolvedAccess, ResourcePrincipalsQuery,
};
use crate::models::provider::{
    GrantUserProviderAccessRequest, ProviderAccessEntry, ProviderAccessListResponse, UpdateAccessRoleRequest,
};

#[utoipa::path(
    post,
    path = "/access/grant",
    tag = "Access",
    request_body = AccessGrantRequest,
    responses(
        (status = 200, description = "Access granted", body = ResolvedAccess),
        (status = 403, description = "Caller is not an owner of the resource"),
        (status = 404, description = "Resource or principal not found"),
        (status = 409, description = "Concurrent grant on the same key")
    )
)]
pub async fn grant_access(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Json(payload): Json<AccessGrantRequest>,
) -> AppResult<Json<ResolvedAccess>> {
    let principal = Principal::new(payload.principal_type, payload.principal_id);
    let resource = Resource::new(payload.resource_type, payload.resource_id);

    let mut tx = state.pool.begin().await?;
    let access = grants::grant(&mut tx, auth.principal, principal, resource, payload.role).await?;
    tx.commit().await?;

    Ok(Json(access))
}

#[utoipa::path(
    delete,
    path = "/access/revoke",
    tag = "Access",
    params(AccessRevokeQuery),
    responses(
        (status = 204, description = "Direct access revoked"),
        (status = 403, description = "Caller is not an owner of the resource"),
        (status = 404, description = "No direct access tuple for this pair")
    )
)]
pub async fn revoke_access(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Query(query): Query<AccessRevokeQuery>,
) -> AppResult<StatusCode> {
    let principal = Principal::new(query.principal_type, query.principal_id);
    let resource = Resource::new(query.resource_type, query.resource_id);

    let mut tx = state.pool.begin().await?;
    grants::revoke(&mut tx, auth.principal, principal, resource).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/access/role",
    tag = "Access",
    request_body = AccessRoleUpdateRequest,
    responses(
        (status = 200, description = "Role updated", body = ResolvedAccess),
        (status = 403, description = "Caller is not an owner of the resource"),
        (status = 404, description = "No direct access tuple for this pair")
    )
)]
pub async fn update_access_role(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Json(payload): Json<AccessRoleUpdateRequest>,
) -> AppResult<Json<ResolvedAccess>> {
    let principal = Principal::new(payload.principal_type, payload.principal_id);
    let resource = Resource::new(payload.resource_type, payload.resource_id);

    let mut tx = state.pool.begin().await?;
    let access = grants::update_role(&mut tx, auth.principal, principal, resource, payload.role).await?;
    tx.commit().await?;

    Ok(Json(access))
}

#[utoipa::path(
    get,
    path = "/access/role",
    tag = "Access",
    params(EffectiveRoleQuery),
    responses((status = 200, description = "Caller's effective role, null when none", body = EffectiveRoleResponse))
)]
pub async fn get_effective_role(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Query(query): Query<EffectiveRoleQuery>,
) -> AppResult<Json<EffectiveRoleResponse>> {
    let resource = Resource::new(query.resource_type, query.resource_id);

    let mut conn = state.pool.acquire().await?;
    let access = resolver::resolve_access(&mut conn, auth.principal, resource).await?;

    Ok(Json(EffectiveRoleResponse {
        resource_type: resource.resource_type,
        resource_id: resource.resource_id,
        role: access.as_ref().map(|a| a.role),
        inherited_from: access.and_then(|a| a.inherited_from),
    }))
}

#[utoipa::path(
    get,
    path = "/access/resources",
    tag = "Access",
    params(AccessibleResourcesQuery),
    responses((status = 200, description = "Resources the caller can reach", body = [ResolvedAccess]))
)]
pub async fn list_accessible_resources(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Query(query): Query<AccessibleResourcesQuery>,
) -> AppResult<Json<Vec<ResolvedAccess>>> {
    let mut conn = state.pool.acquire().await?;
    let results = enumerator::list_accessible(
        &mut conn,
        auth.principal,
        query.resource_type,
        query.min_role,
        query.expand_hierarchy,
    )
    .await?;

    Ok(Json(results))
}

#[utoipa::path(
    get,
    path = "/access/principals",
    tag = "Access",
    params(ResourcePrincipalsQuery),
    responses(
        (status = 200, description = "Principals with access to the resource", body = [ResolvedAccess]),
        (status = 404, description = "Resource not found or not visible to the caller")
    )
)]
pub async fn list_resource_principals(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Query(query): Query<ResourcePrincipalsQuery>,
) -> AppResult<Json<Vec<ResolvedAccess>>> {
    let resource = Resource::new(query.resource_type, query.resource_id);

    let mut conn = state.pool.acquire().await?;
    resolver::require_visible(&mut conn, auth.principal, resource).await?;
    let results = enumerator::list_principals(&mut conn, resource, query.principal_type, query.min_role).await?;

    Ok(Json(results))
}

// =============================================================================
// PROVIDER USER ACCESS
// =============================================================================

async fn provider_entry(conn: &mut SqliteConnection, access: &ResolvedAccess) -> AppResult<ProviderAccessEntry> {
    let tuple_id = access
        .tuple_id
        .ok_or_else(|| AppError::internal("provider access is always direct"))?;
    let profile = lookup::user_profile(conn, access.principal_id).await?;

    Ok(ProviderAccessEntry {
        id: tuple_id,
        user_id: access.principal_id,
        user_email: profile.as_ref().map(|(email, _)| email.clone()),
        user_name: profile.and_then(|(_, name)| name),
        role: access.role,
    })
}

#[utoipa::path(
    get,
    path = "/access/providers/{id}/users",
    tag = "Access",
    params(("id" = Uuid, Path, description = "Provider id")),
    responses(
        (status = 200, description = "Users with access to the provider", body = ProviderAccessListResponse),
        (status = 404, description = "Provider not found or not visible to the caller")
    )
)]
pub async fn list_provider_users(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(provider_id): Path<Uuid>,
) -> AppResult<Json<ProviderAccessListResponse>> {
    let provider = Resource::provider(provider_id);

    let mut conn = state.pool.acquire().await?;
    resolver::require_visible(&mut conn, auth.principal, provider).await?;

    let access = enumerator::list_principals(&mut conn, provider, Some(PrincipalType::User), None).await?;

    let mut results = Vec::with_capacity(access.len());
    for entry in &access {
        results.push(provider_entry(&mut conn, entry).await?);
    }

    Ok(Json(ProviderAccessListResponse { results }))
}

#[utoipa::path(
    post,
    path = "/access/providers/{id}/users",
    tag = "Access",
    params(("id" = Uuid, Path, description = "Provider id")),
    request_body = GrantUserProviderAccessRequest,
    responses(
        (status = 200, description = "User access granted", body = ProviderAccessEntry),
        (status = 403, description = "Caller is not an owner of the provider"),
        (status = 404, description = "Provider or user not found")
    )
)]
pub async fn grant_provider_user(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(provider_id): Path<Uuid>,
    Json(payload): Json<GrantUserProviderAccessRequest>,
) -> AppResult<Json<ProviderAccessEntry>> {
    let mut tx = state.pool.begin().await?;
    let access = grants::grant(
        &mut tx,
        auth.principal,
        Principal::user(payload.user_id),
        Resource::provider(provider_id),
        payload.role,
    )
    .await?;
    let entry = provider_entry(&mut tx, &access).await?;
    tx.commit().await?;

    Ok(Json(entry))
}

#[utoipa::path(
    patch,
    path = "/access/providers/{id}/users/{user_id}",
    tag = "Access",
    params(
        ("id" = Uuid, Path, description = "Provider id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    request_body = UpdateAccessRoleRequest,
    responses(
        (status = 200, description = "User role updated", body = ProviderAccessEntry),
        (status = 403, description = "Caller is not an owner of the provider"),
        (status = 404, description = "No access tuple for this user")
    )
)]
pub async fn update_provider_user(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path((provider_id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateAccessRoleRequest>,
) -> AppResult<Json<ProviderAccessEntry>> {
    let mut tx = state.pool.begin().await?;
    let access = grants::update_role(
        &mut tx,
        auth.principal,
        Principal::user(user_id),
        Resource::provider(provider_id),
        payload.role,
    )
    .await?;
    let entry = provider_entry(&mut tx, &access).await?;
    tx.commit().await?;

    Ok(Json(entry))
}

#[utoipa::path(
    delete,
    path = "/access/providers/{id}/users/{user_id}",
    tag = "Access",
    params(
        ("id" = Uuid, Path, description = "Provider id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 204, description = "User access revoked"),
        (status = 403, description = "Caller is not an owner of the provider"),
        (status = 404, description = "No access tuple for this user")
    )
)]
pub async fn revoke_provider_user(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path((provider_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let mut tx = state.pool.begin().await?;
    grants::revoke(&mut tx, auth.principal, Principal::user(user_id), Resource::provider(provider_id)).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
