//! Folder tree storage and traversal.
//!
//! The tree is stored as `parent_folder_id` pointers and walked iteratively,
//! one level per query. Readers never trust the stored tree to be acyclic:
//! every walk keeps a visited set and stops on a repeated id.

use std::collections::HashSet;

use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::db::row_parsers::{folder_from_row, get_opt_uuid, parse_uuid, workflow_from_row};
use crate::errors::{AppError, AppResult};
use crate::models::folder::{Folder, FolderDepth};
use crate::models::workflow::Workflow;
use crate::utils::{clean_name, placeholders, utc_now, MAX_BIND_PARAMS};

const FOLDER_COLUMNS: &str = "id, namespace_id, name, parent_folder_id, created_at, updated_at";
const WORKFLOW_COLUMNS: &str = "id, namespace_id, name, parent_folder_id, created_at, updated_at";

/// Result of an upward walk.
#[derive(Debug, Clone, Default)]
pub struct AncestorWalk {
    /// Depth 0 is the starting folder.
    pub chain: Vec<FolderDepth>,
    /// True when the walk stopped because a folder id repeated.
    pub cycle: bool,
}

// =============================================================================
// READS
// =============================================================================

pub async fn get_folder(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<Option<Folder>> {
    let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(folder_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(folder_from_row).transpose()
}

pub async fn require_folder(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<Folder> {
    get_folder(conn, folder_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("folder {folder_id} not found")))
}

/// Follow `parent_folder_id` upward from `folder_id` until a root.
///
/// Returns an empty chain when the folder does not exist. A dangling parent
/// pointer ends the chain at the last existing folder.
pub async fn walk_ancestors(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<AncestorWalk> {
    let mut walk = AncestorWalk::default();
    let mut visited = HashSet::new();
    let mut current = Some(folder_id);
    let mut depth = 0u32;

    while let Some(id) = current {
        if !visited.insert(id) {
            tracing::warn!(start = %folder_id, repeated = %id, "folder parent chain contains a cycle");
            walk.cycle = true;
            break;
        }

        let row = sqlx::query("SELECT parent_folder_id FROM folders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            break;
        };

        walk.chain.push(FolderDepth { folder_id: id, depth });
        current = get_opt_uuid(&row, "parent_folder_id")?;
        depth += 1;
    }

    Ok(walk)
}

/// Ancestor chain of `folder_id`, nearest first, including the folder itself at depth 0.
pub async fn ancestors(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<Vec<FolderDepth>> {
    Ok(walk_ancestors(conn, folder_id).await?.chain)
}

/// Every folder below `folder_id`, breadth-first, including the folder itself at depth 0.
///
/// Siblings are ordered by `(created_at, id)` so repeated calls on an
/// unchanged tree return the same sequence.
pub async fn descendants(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<Vec<FolderDepth>> {
    if get_folder(conn, folder_id).await?.is_none() {
        return Ok(Vec::new());
    }

    let mut result = vec![FolderDepth { folder_id, depth: 0 }];
    let mut visited = HashSet::from([folder_id]);
    let mut frontier = vec![folder_id];
    let mut depth = 0u32;

    while !frontier.is_empty() {
        depth += 1;
        let mut next = Vec::new();

        for child in child_ids(conn, &frontier).await? {
            if !visited.insert(child) {
                tracing::warn!(start = %folder_id, repeated = %child, "folder subtree contains a cycle");
                continue;
            }
            result.push(FolderDepth { folder_id: child, depth });
            next.push(child);
        }

        frontier = next;
    }

    Ok(result)
}

async fn child_ids(conn: &mut SqliteConnection, parents: &[Uuid]) -> AppResult<Vec<Uuid>> {
    let mut ids = Vec::new();

    for chunk in parents.chunks(MAX_BIND_PARAMS) {
        let sql = format!(
            "SELECT id FROM folders WHERE parent_folder_id IN ({}) ORDER BY created_at, id",
            placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id.to_string());
        }

        for row in query.fetch_all(&mut *conn).await? {
            ids.push(parse_uuid(row.try_get::<&str, _>("id")?)?);
        }
    }

    Ok(ids)
}

/// Direct children of `parent_folder_id`, or root folders when `None`.
pub async fn child_folders(
    conn: &mut SqliteConnection,
    namespace_id: Option<Uuid>,
    parent_folder_id: Option<Uuid>,
) -> AppResult<Vec<Folder>> {
    let mut sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE ");
    sql.push_str(match parent_folder_id {
        Some(_) => "parent_folder_id = ?",
        None => "parent_folder_id IS NULL",
    });
    if namespace_id.is_some() {
        sql.push_str(" AND namespace_id = ?");
    }
    sql.push_str(" ORDER BY name, id");

    let mut query = sqlx::query(&sql);
    if let Some(parent) = parent_folder_id {
        query = query.bind(parent.to_string());
    }
    if let Some(namespace) = namespace_id {
        query = query.bind(namespace.to_string());
    }

    query
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(folder_from_row)
        .collect()
}

/// Root-first list of folders ending with `folder_id`.
pub async fn folder_path(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<Vec<Folder>> {
    let chain = ancestors(conn, folder_id).await?;
    let mut path = Vec::with_capacity(chain.len());

    for entry in chain.iter().rev() {
        path.push(require_folder(conn, entry.folder_id).await?);
    }

    Ok(path)
}

pub async fn get_workflow(conn: &mut SqliteConnection, workflow_id: Uuid) -> AppResult<Option<Workflow>> {
    let sql = format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(workflow_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(workflow_from_row).transpose()
}

pub async fn require_workflow(conn: &mut SqliteConnection, workflow_id: Uuid) -> AppResult<Workflow> {
    get_workflow(conn, workflow_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("workflow {workflow_id} not found")))
}

/// Folder a workflow lives in; `None` for a root workflow or an unknown id.
pub async fn workflow_folder(conn: &mut SqliteConnection, workflow_id: Uuid) -> AppResult<Option<Uuid>> {
    let row = sqlx::query("SELECT parent_folder_id FROM workflows WHERE id = ?")
        .bind(workflow_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => get_opt_uuid(&row, "parent_folder_id"),
        None => Ok(None),
    }
}

/// Workflows whose `parent_folder_id` is any of `folder_ids`, as `(workflow_id, folder_id)`.
pub async fn workflows_in(conn: &mut SqliteConnection, folder_ids: &[Uuid]) -> AppResult<Vec<(Uuid, Uuid)>> {
    let mut found = Vec::new();

    for chunk in folder_ids.chunks(MAX_BIND_PARAMS) {
        let sql = format!(
            "SELECT id, parent_folder_id FROM workflows WHERE parent_folder_id IN ({}) ORDER BY created_at, id",
            placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id.to_string());
        }

        for row in query.fetch_all(&mut *conn).await? {
            let workflow_id = parse_uuid(row.try_get::<&str, _>("id")?)?;
            let folder_id = parse_uuid(row.try_get::<&str, _>("parent_folder_id")?)?;
            found.push((workflow_id, folder_id));
        }
    }

    Ok(found)
}

// =============================================================================
// WRITES
// =============================================================================

/// Parent folder for a new or moved child: must exist and share the namespace.
async fn checked_parent(conn: &mut SqliteConnection, namespace_id: Uuid, parent_id: Uuid) -> AppResult<Folder> {
    let parent = get_folder(conn, parent_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("parent folder {parent_id} not found")))?;

    if parent.namespace_id != namespace_id {
        return Err(AppError::invalid_argument("parent folder must be in the same namespace"));
    }

    Ok(parent)
}

pub async fn create_folder(
    conn: &mut SqliteConnection,
    namespace_id: Uuid,
    name: &str,
    parent_folder_id: Option<Uuid>,
) -> AppResult<Folder> {
    let name = clean_name(name).ok_or_else(|| AppError::invalid_argument("folder name must not be empty"))?;

    if let Some(parent_id) = parent_folder_id {
        checked_parent(conn, namespace_id, parent_id).await?;
    }

    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO folders (id, namespace_id, name, parent_folder_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(namespace_id.to_string())
    .bind(&name)
    .bind(parent_folder_id.map(|p| p.to_string()))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    tracing::info!(folder_id = %id, namespace_id = %namespace_id, "folder created");
    require_folder(conn, id).await
}

pub async fn rename_folder(conn: &mut SqliteConnection, folder_id: Uuid, name: &str) -> AppResult<Folder> {
    let name = clean_name(name).ok_or_else(|| AppError::invalid_argument("folder name must not be empty"))?;

    let affected = sqlx::query("UPDATE folders SET name = ?, updated_at = ? WHERE id = ?")
        .bind(&name)
        .bind(utc_now())
        .bind(folder_id.to_string())
        .execute(&mut *conn)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found(format!("folder {folder_id} not found")));
    }

    require_folder(conn, folder_id).await
}

/// Re-parent a folder, or make it a root with `None`.
///
/// Must run inside the caller's transaction: the folder row is written before
/// the ancestor walk so the transaction already holds the write lock while
/// the cycle check reads, and two concurrent moves cannot both pass it.
pub async fn move_folder(
    conn: &mut SqliteConnection,
    folder_id: Uuid,
    new_parent: Option<Uuid>,
) -> AppResult<Folder> {
    let now = utc_now();

    let touched = sqlx::query("UPDATE folders SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(folder_id.to_string())
        .execute(&mut *conn)
        .await?;

    if touched.rows_affected() == 0 {
        return Err(AppError::not_found(format!("folder {folder_id} not found")));
    }

    let folder = require_folder(conn, folder_id).await?;

    if let Some(parent_id) = new_parent {
        if parent_id == folder_id {
            return Err(AppError::cycle_detected("cannot move a folder into itself"));
        }

        checked_parent(conn, folder.namespace_id, parent_id).await?;

        let walk = walk_ancestors(conn, parent_id).await?;
        if walk.cycle {
            return Err(AppError::cycle_detected(format!(
                "ancestor chain of folder {parent_id} already contains a cycle"
            )));
        }
        if walk.chain.iter().any(|entry| entry.folder_id == folder_id) {
            return Err(AppError::cycle_detected("cannot move a folder into its own descendant"));
        }
    }

    sqlx::query("UPDATE folders SET parent_folder_id = ?, updated_at = ? WHERE id = ?")
        .bind(new_parent.map(|p| p.to_string()))
        .bind(now)
        .bind(folder_id.to_string())
        .execute(&mut *conn)
        .await?;

    tracing::info!(folder_id = %folder_id, parent_folder_id = ?new_parent, "folder moved");
    require_folder(conn, folder_id).await
}

/// Ids removed by [`delete_folder_tree`].
#[derive(Debug, Clone, Default)]
pub struct RemovedSubtree {
    pub folders: Vec<Uuid>,
    pub workflows: Vec<Uuid>,
}

/// Delete a folder with every descendant folder and contained workflow.
///
/// Access tuples on the removed resources are left to the caller so it can
/// drop them in the same transaction.
pub async fn delete_folder_tree(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<RemovedSubtree> {
    let folders: Vec<Uuid> = descendants(conn, folder_id)
        .await?
        .into_iter()
        .map(|entry| entry.folder_id)
        .collect();

    if folders.is_empty() {
        return Err(AppError::not_found(format!("folder {folder_id} not found")));
    }

    let workflows: Vec<Uuid> = workflows_in(conn, &folders)
        .await?
        .into_iter()
        .map(|(workflow_id, _)| workflow_id)
        .collect();

    delete_ids(conn, "workflows", &workflows).await?;
    // deepest first so no statement leaves a child pointing at a removed parent
    let deepest_first: Vec<Uuid> = folders.iter().rev().copied().collect();
    delete_ids(conn, "folders", &deepest_first).await?;

    tracing::info!(
        folder_id = %folder_id,
        folders = folders.len(),
        workflows = workflows.len(),
        "folder tree deleted"
    );

    Ok(RemovedSubtree { folders, workflows })
}

async fn delete_ids(conn: &mut SqliteConnection, table: &str, ids: &[Uuid]) -> AppResult<()> {
    for chunk in ids.chunks(MAX_BIND_PARAMS) {
        let sql = format!("DELETE FROM {table} WHERE id IN ({})", placeholders(chunk.len()));
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id.to_string());
        }
        query.execute(&mut *conn).await?;
    }
    Ok(())
}

pub async fn create_workflow(
    conn: &mut SqliteConnection,
    namespace_id: Uuid,
    name: &str,
    parent_folder_id: Option<Uuid>,
) -> AppResult<Workflow> {
    let name = clean_name(name).ok_or_else(|| AppError::invalid_argument("workflow name must not be empty"))?;

    if let Some(parent_id) = parent_folder_id {
        checked_parent(conn, namespace_id, parent_id).await?;
    }

    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO workflows (id, namespace_id, name, parent_folder_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(namespace_id.to_string())
    .bind(&name)
    .bind(parent_folder_id.map(|p| p.to_string()))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    tracing::info!(workflow_id = %id, namespace_id = %namespace_id, "workflow created");
    require_workflow(conn, id).await
}

pub async fn move_workflow(
    conn: &mut SqliteConnection,
    workflow_id: Uuid,
    parent_folder_id: Option<Uuid>,
) -> AppResult<Workflow> {
    let workflow = require_workflow(conn, workflow_id).await?;

    if let Some(parent_id) = parent_folder_id {
        checked_parent(conn, workflow.namespace_id, parent_id).await?;
    }

    sqlx::query("UPDATE workflows SET parent_folder_id = ?, updated_at = ? WHERE id = ?")
        .bind(parent_folder_id.map(|p| p.to_string()))
        .bind(utc_now())
        .bind(workflow_id.to_string())
        .execute(&mut *conn)
        .await?;

    tracing::info!(workflow_id = %workflow_id, parent_folder_id = ?parent_folder_id, "workflow moved");
    require_workflow(conn, workflow_id).await
}

pub async fn delete_workflow(conn: &mut SqliteConnection, workflow_id: Uuid) -> AppResult<()> {
    let affected = sqlx::query("DELETE FROM workflows WHERE id = ?")
        .bind(workflow_id.to_string())
        .execute(&mut *conn)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found(format!("workflow {workflow_id} not found")));
    }

    Ok(())
}
