//! Grant, revoke and role change on direct tuples.
//!
//! Each call performs its ownership check and its write on the same
//! connection; callers pass an open transaction and commit afterwards.

use sqlx::SqliteConnection;

use crate::authz::{lookup, resolver, tuples, Principal, Resource, Role};
use crate::errors::{AppError, AppResult};
use crate::models::access::ResolvedAccess;

async fn ensure_resource(conn: &mut SqliteConnection, resource: Resource) -> AppResult<()> {
    if !lookup::resource_exists(conn, resource).await? {
        return Err(AppError::not_found(format!("{resource} not found")));
    }
    Ok(())
}

/// Give `principal` a direct `role` on `resource`, overwriting any existing direct role.
pub async fn grant(
    conn: &mut SqliteConnection,
    caller: Principal,
    principal: Principal,
    resource: Resource,
    role: Role,
) -> AppResult<ResolvedAccess> {
    ensure_resource(conn, resource).await?;
    resolver::require_role(conn, caller, resource, Role::Owner).await?;

    if !lookup::principal_exists(conn, principal).await? {
        return Err(AppError::not_found(format!("{principal} not found")));
    }

    let tuple = tuples::upsert(conn, principal, resource, role).await?;

    tracing::info!(
        caller = %caller,
        principal = %principal,
        resource = %resource,
        role = %role,
        tuple_id = %tuple.id,
        "access granted"
    );

    Ok(ResolvedAccess::direct(&tuple))
}

/// Remove the direct tuple of `principal` on `resource`. Inherited access is untouched.
pub async fn revoke(
    conn: &mut SqliteConnection,
    caller: Principal,
    principal: Principal,
    resource: Resource,
) -> AppResult<()> {
    ensure_resource(conn, resource).await?;
    resolver::require_role(conn, caller, resource, Role::Owner).await?;

    if !tuples::delete(conn, principal, resource).await? {
        return Err(AppError::not_found(format!("no direct access for {principal} on {resource}")));
    }

    tracing::info!(caller = %caller, principal = %principal, resource = %resource, "access revoked");
    Ok(())
}

/// Change the role of an existing direct tuple.
pub async fn update_role(
    conn: &mut SqliteConnection,
    caller: Principal,
    principal: Principal,
    resource: Resource,
    role: Role,
) -> AppResult<ResolvedAccess> {
    ensure_resource(conn, resource).await?;
    resolver::require_role(conn, caller, resource, Role::Owner).await?;

    let tuple = tuples::update_role(conn, principal, resource, role)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no direct access for {principal} on {resource}")))?;

    tracing::info!(caller = %caller, principal = %principal, resource = %resource, role = %role, "access role updated");

    Ok(ResolvedAccess::direct(&tuple))
}
