use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::authz::{Principal, PrincipalType, Resource};
use crate::errors::AppResult;

fn principal_table(principal_type: PrincipalType) -> &'static str {
    match principal_type {
        PrincipalType::User => "users",
        PrincipalType::ServiceAccount => "service_accounts",
    }
}

pub async fn resource_exists(conn: &mut SqliteConnection, resource: Resource) -> AppResult<bool> {
    row_exists(conn, resource.resource_type.table(), resource.resource_id).await
}

pub async fn principal_exists(conn: &mut SqliteConnection, principal: Principal) -> AppResult<bool> {
    row_exists(conn, principal_table(principal.principal_type), principal.principal_id).await
}

async fn row_exists(conn: &mut SqliteConnection, table: &str, id: Uuid) -> AppResult<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)");
    let exists = sqlx::query_scalar::<_, i64>(&sql)
        .bind(id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists != 0)
}

/// `(email, name)` of a user principal.
pub async fn user_profile(conn: &mut SqliteConnection, user_id: Uuid) -> AppResult<Option<(String, Option<String>)>> {
    let row = sqlx::query_as::<_, (String, Option<String>)>("SELECT email, name FROM users WHERE id = ?")
        .bind(user_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}
