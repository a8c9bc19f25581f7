//! Set-valued queries: what a principal can reach, and who can reach a resource.

use std::collections::HashMap;
use std::hash::Hash;

use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::authz::resolver::inheritance_chain;
use crate::authz::{hierarchy, meets_minimum, outranks, tuples, Principal, PrincipalType, Resource, ResourceType, Role};
use crate::errors::AppResult;
use crate::models::access::{AccessTuple, ResolvedAccess};

/// Insertion-ordered map with one entry per key where a strictly higher role replaces.
struct BestByKey<K> {
    index: HashMap<K, usize>,
    entries: Vec<ResolvedAccess>,
}

impl<K: Eq + Hash> BestByKey<K> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn record(&mut self, key: K, access: ResolvedAccess) {
        match self.index.get(&key) {
            Some(&slot) => {
                if outranks(access.role, self.entries[slot].role) {
                    self.entries[slot] = access;
                }
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(access);
            }
        }
    }

    fn into_filtered(self, keep: impl Fn(&ResolvedAccess) -> bool) -> Vec<ResolvedAccess> {
        self.entries.into_iter().filter(|access| keep(access)).collect()
    }
}

fn passes_min(access: &ResolvedAccess, min_role: Option<Role>) -> bool {
    min_role.map_or(true, |min| meets_minimum(access.role, min))
}

/// Every resource `principal` can reach.
///
/// Without expansion only direct tuples are returned. With expansion each
/// direct folder grant also covers every descendant folder and every
/// workflow inside the granted subtree, attributed to the granted folder.
/// Folder grants are expanded oldest first, so on equal roles the entry
/// recorded first is kept.
pub async fn list_accessible(
    conn: &mut SqliteConnection,
    principal: Principal,
    resource_type: Option<ResourceType>,
    min_role: Option<Role>,
    expand_hierarchy: bool,
) -> AppResult<Vec<ResolvedAccess>> {
    let direct = tuples::find_by_principal(conn, principal, None).await?;
    let mut best = BestByKey::new();

    for tuple in &direct {
        best.record(tuple.resource(), ResolvedAccess::direct(tuple));
    }

    if expand_hierarchy {
        let folder_grants: Vec<&AccessTuple> = direct
            .iter()
            .filter(|tuple| tuple.resource_type == ResourceType::Folder)
            .collect();

        for grant in folder_grants {
            let subtree = hierarchy::descendants(conn, grant.resource_id).await?;
            let folder_ids: Vec<Uuid> = subtree.iter().map(|entry| entry.folder_id).collect();

            for entry in subtree.iter().filter(|entry| entry.depth > 0) {
                let resource = Resource::folder(entry.folder_id);
                best.record(
                    resource,
                    ResolvedAccess::inherited(principal, resource, grant.role, grant.resource_id),
                );
            }

            for (workflow_id, _) in hierarchy::workflows_in(conn, &folder_ids).await? {
                let resource = Resource::workflow(workflow_id);
                best.record(
                    resource,
                    ResolvedAccess::inherited(principal, resource, grant.role, grant.resource_id),
                );
            }
        }
    }

    let results = best.into_filtered(|access| {
        resource_type.map_or(true, |wanted| access.resource_type == wanted) && passes_min(access, min_role)
    });

    tracing::debug!(
        principal = %principal,
        expand_hierarchy,
        count = results.len(),
        "listed accessible resources"
    );

    Ok(results)
}

/// Every principal that can reach `resource`, directly or through an ancestor folder.
///
/// Direct tuples are recorded first, then ancestors nearest first; a
/// principal keeps one entry carrying its highest role.
pub async fn list_principals(
    conn: &mut SqliteConnection,
    resource: Resource,
    principal_type: Option<PrincipalType>,
    min_role: Option<Role>,
) -> AppResult<Vec<ResolvedAccess>> {
    let mut best = BestByKey::new();

    for tuple in tuples::find_by_resource(conn, resource, principal_type).await? {
        best.record(tuple.principal(), ResolvedAccess::direct(&tuple));
    }

    let chain = inheritance_chain(conn, resource).await?;
    if !chain.is_empty() {
        let folder_ids: Vec<Uuid> = chain.iter().map(|entry| entry.folder_id).collect();
        let mut by_folder: HashMap<Uuid, Vec<AccessTuple>> = HashMap::new();
        for tuple in tuples::find_by_resources(conn, ResourceType::Folder, &folder_ids, principal_type).await? {
            by_folder.entry(tuple.resource_id).or_default().push(tuple);
        }

        for entry in &chain {
            for tuple in by_folder.get(&entry.folder_id).into_iter().flatten() {
                let principal = tuple.principal();
                best.record(
                    principal,
                    ResolvedAccess::inherited(principal, resource, tuple.role, entry.folder_id),
                );
            }
        }
    }

    let results = best.into_filtered(|access| passes_min(access, min_role));

    tracing::debug!(resource = %resource, count = results.len(), "listed resource principals");

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(resource: Resource, role: Role, from: Option<Uuid>) -> ResolvedAccess {
        let principal = Principal::user(Uuid::nil());
        match from {
            Some(folder) => ResolvedAccess::inherited(principal, resource, role, folder),
            None => ResolvedAccess {
                principal_type: principal.principal_type,
                principal_id: principal.principal_id,
                resource_type: resource.resource_type,
                resource_id: resource.resource_id,
                role,
                inherited_from: None,
                tuple_id: None,
            },
        }
    }

    #[test]
    fn higher_role_replaces_and_ties_keep_first() {
        let workflow = Resource::workflow(Uuid::new_v4());
        let first_folder = Uuid::new_v4();
        let second_folder = Uuid::new_v4();

        let mut best = BestByKey::new();
        best.record(workflow, access(workflow, Role::User, None));
        best.record(workflow, access(workflow, Role::User, Some(first_folder)));
        assert_eq!(best.entries[0].inherited_from, None);

        best.record(workflow, access(workflow, Role::Owner, Some(first_folder)));
        best.record(workflow, access(workflow, Role::Owner, Some(second_folder)));

        let results = best.into_filtered(|_| true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].role, Role::Owner);
        assert_eq!(results[0].inherited_from, Some(first_folder));
    }

    #[test]
    fn min_role_filter() {
        let folder = Resource::folder(Uuid::new_v4());
        let entry = access(folder, Role::User, None);
        assert!(passes_min(&entry, None));
        assert!(passes_min(&entry, Some(Role::User)));
        assert!(!passes_min(&entry, Some(Role::Owner)));
    }
}
