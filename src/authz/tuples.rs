//! Direct grants keyed by `(principal_type, principal_id, resource_type, resource_id)`.

use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::authz::{Principal, PrincipalType, Resource, ResourceType, Role};
use crate::db::row_parsers::db_access_tuple_from_row;
use crate::errors::{AppError, AppResult};
use crate::models::access::AccessTuple;
use crate::utils::{placeholders, utc_now, MAX_BIND_PARAMS};

const TUPLE_COLUMNS: &str =
    "id, principal_type, principal_id, resource_type, resource_id, role, created_at, updated_at";

fn tuple_from_row(row: &SqliteRow) -> AppResult<AccessTuple> {
    AccessTuple::try_from(db_access_tuple_from_row(row)?)
}

fn tuples_from_rows(rows: Vec<SqliteRow>) -> AppResult<Vec<AccessTuple>> {
    rows.iter().map(tuple_from_row).collect()
}

fn map_unique_violation(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::conflict("access tuple was modified concurrently")
        }
        _ => AppError::from(err),
    }
}

/// Insert a tuple or overwrite the role of the existing one for the same key.
pub async fn upsert(
    conn: &mut SqliteConnection,
    principal: Principal,
    resource: Resource,
    role: Role,
) -> AppResult<AccessTuple> {
    let now = utc_now();

    let sql = format!(
        "INSERT INTO access_tuples ({TUPLE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(principal_type, principal_id, resource_type, resource_id) \
         DO UPDATE SET role = excluded.role, updated_at = excluded.updated_at \
         RETURNING {TUPLE_COLUMNS}"
    );

    let row = sqlx::query(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(principal.principal_type.as_str())
        .bind(principal.principal_id.to_string())
        .bind(resource.resource_type.as_str())
        .bind(resource.resource_id.to_string())
        .bind(role.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_unique_violation)?;

    tuple_from_row(&row)
}

/// Remove the direct tuple; `false` when there was none.
pub async fn delete(conn: &mut SqliteConnection, principal: Principal, resource: Resource) -> AppResult<bool> {
    let result = sqlx::query(
        "DELETE FROM access_tuples WHERE principal_type = ? AND principal_id = ? AND resource_type = ? AND resource_id = ?",
    )
    .bind(principal.principal_type.as_str())
    .bind(principal.principal_id.to_string())
    .bind(resource.resource_type.as_str())
    .bind(resource.resource_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn find(
    conn: &mut SqliteConnection,
    principal: Principal,
    resource: Resource,
) -> AppResult<Option<AccessTuple>> {
    let sql = format!(
        "SELECT {TUPLE_COLUMNS} FROM access_tuples \
         WHERE principal_type = ? AND principal_id = ? AND resource_type = ? AND resource_id = ?"
    );
    let row = sqlx::query(&sql)
        .bind(principal.principal_type.as_str())
        .bind(principal.principal_id.to_string())
        .bind(resource.resource_type.as_str())
        .bind(resource.resource_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(tuple_from_row).transpose()
}

/// Change the role of an existing direct tuple; `None` when there is no tuple.
pub async fn update_role(
    conn: &mut SqliteConnection,
    principal: Principal,
    resource: Resource,
    role: Role,
) -> AppResult<Option<AccessTuple>> {
    let sql = format!(
        "UPDATE access_tuples SET role = ?, updated_at = ? \
         WHERE principal_type = ? AND principal_id = ? AND resource_type = ? AND resource_id = ? \
         RETURNING {TUPLE_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(role.as_str())
        .bind(utc_now())
        .bind(principal.principal_type.as_str())
        .bind(principal.principal_id.to_string())
        .bind(resource.resource_type.as_str())
        .bind(resource.resource_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(tuple_from_row).transpose()
}

/// Tuples held by a principal, oldest first.
pub async fn find_by_principal(
    conn: &mut SqliteConnection,
    principal: Principal,
    resource_type: Option<ResourceType>,
) -> AppResult<Vec<AccessTuple>> {
    let mut sql = format!("SELECT {TUPLE_COLUMNS} FROM access_tuples WHERE principal_type = ? AND principal_id = ?");
    if resource_type.is_some() {
        sql.push_str(" AND resource_type = ?");
    }
    sql.push_str(" ORDER BY created_at, id");

    let mut query = sqlx::query(&sql)
        .bind(principal.principal_type.as_str())
        .bind(principal.principal_id.to_string());
    if let Some(resource_type) = resource_type {
        query = query.bind(resource_type.as_str());
    }

    tuples_from_rows(query.fetch_all(&mut *conn).await?)
}

/// Tuples on a resource, optionally narrowed to one principal type, oldest first.
pub async fn find_by_resource(
    conn: &mut SqliteConnection,
    resource: Resource,
    principal_type: Option<PrincipalType>,
) -> AppResult<Vec<AccessTuple>> {
    let mut sql = format!("SELECT {TUPLE_COLUMNS} FROM access_tuples WHERE resource_type = ? AND resource_id = ?");
    if principal_type.is_some() {
        sql.push_str(" AND principal_type = ?");
    }
    sql.push_str(" ORDER BY created_at, id");

    let mut query = sqlx::query(&sql)
        .bind(resource.resource_type.as_str())
        .bind(resource.resource_id.to_string());
    if let Some(principal_type) = principal_type {
        query = query.bind(principal_type.as_str());
    }

    tuples_from_rows(query.fetch_all(&mut *conn).await?)
}

/// A principal's tuples on any of the given resources.
pub async fn find_for_principal_on(
    conn: &mut SqliteConnection,
    principal: Principal,
    resource_type: ResourceType,
    resource_ids: &[Uuid],
) -> AppResult<Vec<AccessTuple>> {
    let mut found = Vec::new();

    for chunk in resource_ids.chunks(MAX_BIND_PARAMS) {
        let sql = format!(
            "SELECT {TUPLE_COLUMNS} FROM access_tuples \
             WHERE principal_type = ? AND principal_id = ? AND resource_type = ? AND resource_id IN ({}) \
             ORDER BY created_at, id",
            placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql)
            .bind(principal.principal_type.as_str())
            .bind(principal.principal_id.to_string())
            .bind(resource_type.as_str());
        for id in chunk {
            query = query.bind(id.to_string());
        }

        found.extend(tuples_from_rows(query.fetch_all(&mut *conn).await?)?);
    }

    Ok(found)
}

/// Every tuple on any of the given resources, optionally narrowed to one principal type.
pub async fn find_by_resources(
    conn: &mut SqliteConnection,
    resource_type: ResourceType,
    resource_ids: &[Uuid],
    principal_type: Option<PrincipalType>,
) -> AppResult<Vec<AccessTuple>> {
    let mut found = Vec::new();

    for chunk in resource_ids.chunks(MAX_BIND_PARAMS) {
        let mut sql = format!(
            "SELECT {TUPLE_COLUMNS} FROM access_tuples WHERE resource_type = ? AND resource_id IN ({})",
            placeholders(chunk.len())
        );
        if principal_type.is_some() {
            sql.push_str(" AND principal_type = ?");
        }
        sql.push_str(" ORDER BY created_at, id");

        let mut query = sqlx::query(&sql).bind(resource_type.as_str());
        for id in chunk {
            query = query.bind(id.to_string());
        }
        if let Some(principal_type) = principal_type {
            query = query.bind(principal_type.as_str());
        }

        found.extend(tuples_from_rows(query.fetch_all(&mut *conn).await?)?);
    }

    Ok(found)
}

/// Drop every tuple on the given resources. Returns the number removed.
pub async fn delete_for_resources(
    conn: &mut SqliteConnection,
    resource_type: ResourceType,
    resource_ids: &[Uuid],
) -> AppResult<u64> {
    let mut removed = 0;

    for chunk in resource_ids.chunks(MAX_BIND_PARAMS) {
        let sql = format!(
            "DELETE FROM access_tuples WHERE resource_type = ? AND resource_id IN ({})",
            placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql).bind(resource_type.as_str());
        for id in chunk {
            query = query.bind(id.to_string());
        }
        removed += query.execute(&mut *conn).await?.rows_affected();
    }

    Ok(removed)
}
