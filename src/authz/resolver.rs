//! Effective role of one principal on one resource.

use std::collections::HashMap;

use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::authz::{hierarchy, meets_minimum, outranks, tuples, Principal, Resource, ResourceType, Role};
use crate::errors::{AppError, AppResult};
use crate::models::access::ResolvedAccess;
use crate::models::folder::FolderDepth;

/// Folders whose grants flow down onto `resource`, nearest first.
///
/// For a workflow this is its folder and every ancestor of it; for a folder
/// only its strict ancestors, since the folder's own tuple is the direct grant.
pub(crate) async fn inheritance_chain(conn: &mut SqliteConnection, resource: Resource) -> AppResult<Vec<FolderDepth>> {
    match resource.resource_type {
        ResourceType::Workflow => match hierarchy::workflow_folder(conn, resource.resource_id).await? {
            Some(folder_id) => hierarchy::ancestors(conn, folder_id).await,
            None => Ok(Vec::new()),
        },
        ResourceType::Folder => {
            let chain = hierarchy::ancestors(conn, resource.resource_id).await?;
            Ok(chain.into_iter().filter(|entry| entry.depth > 0).collect())
        }
        ResourceType::Provider => Ok(Vec::new()),
    }
}

/// Highest role `principal` holds on `resource` by any path.
///
/// The direct tuple is considered first and an inherited role only replaces
/// it when strictly higher, so a direct grant wins ties. Among ancestors the
/// nearest folder holding the winning role is reported in `inherited_from`.
pub async fn resolve_access(
    conn: &mut SqliteConnection,
    principal: Principal,
    resource: Resource,
) -> AppResult<Option<ResolvedAccess>> {
    let mut best = tuples::find(conn, principal, resource)
        .await?
        .as_ref()
        .map(ResolvedAccess::direct);

    let chain = inheritance_chain(conn, resource).await?;
    if !chain.is_empty() {
        let folder_ids: Vec<Uuid> = chain.iter().map(|entry| entry.folder_id).collect();
        let folder_roles: HashMap<Uuid, Role> =
            tuples::find_for_principal_on(conn, principal, ResourceType::Folder, &folder_ids)
                .await?
                .into_iter()
                .map(|tuple| (tuple.resource_id, tuple.role))
                .collect();

        for entry in &chain {
            let Some(&role) = folder_roles.get(&entry.folder_id) else {
                continue;
            };
            let replaces = match &best {
                Some(current) => outranks(role, current.role),
                None => true,
            };
            if replaces {
                best = Some(ResolvedAccess::inherited(principal, resource, role, entry.folder_id));
            }
        }
    }

    tracing::debug!(
        principal = %principal,
        resource = %resource,
        role = ?best.as_ref().map(|access| access.role),
        inherited_from = ?best.as_ref().and_then(|access| access.inherited_from),
        "resolved access"
    );

    Ok(best)
}

pub async fn effective_role(
    conn: &mut SqliteConnection,
    principal: Principal,
    resource: Resource,
) -> AppResult<Option<Role>> {
    Ok(resolve_access(conn, principal, resource).await?.map(|access| access.role))
}

/// Gate for mutations: `Forbidden` unless `caller` resolves to at least `min`.
pub async fn require_role(
    conn: &mut SqliteConnection,
    caller: Principal,
    resource: Resource,
    min: Role,
) -> AppResult<Role> {
    match effective_role(conn, caller, resource).await? {
        Some(role) if meets_minimum(role, min) => Ok(role),
        _ => Err(AppError::forbidden(format!("{min} role required on {resource}"))),
    }
}

/// Gate for reads: resources the caller cannot see are reported as missing.
pub async fn require_visible(conn: &mut SqliteConnection, caller: Principal, resource: Resource) -> AppResult<Role> {
    effective_role(conn, caller, resource)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{resource} not found")))
}
