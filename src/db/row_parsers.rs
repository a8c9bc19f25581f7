use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::access::DbAccessTuple;
use crate::models::folder::Folder;
use crate::models::workflow::Workflow;

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    // RFC3339 (what sqlx writes for DateTime<Utc>)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite CURRENT_TIMESTAMP format: "YYYY-MM-DD HH:MM:SS" (optional fraction)
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::internal("invalid datetime: date out of range"))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s.trim()).map_err(|e| AppError::internal(format!("invalid uuid `{}`: {}", s, e)))
}

fn get_string(row: &SqliteRow, column: &str) -> Result<String, AppError> {
    row.try_get(column)
        .map_err(|e| AppError::internal(format!("missing {}: {}", column, e)))
}

fn get_opt_string(row: &SqliteRow, column: &str) -> Result<Option<String>, AppError> {
    row.try_get(column)
        .map_err(|e| AppError::internal(format!("missing {}: {}", column, e)))
}

fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, AppError> {
    parse_uuid(&get_string(row, column)?)
}

pub(crate) fn get_opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, AppError> {
    match get_opt_string(row, column)? {
        Some(s) if !s.trim().is_empty() => Ok(Some(parse_uuid(&s)?)),
        _ => Ok(None),
    }
}

fn get_datetime(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, AppError> {
    parse_datetime(&get_string(row, column)?)
}

pub fn db_access_tuple_from_row(row: &SqliteRow) -> Result<DbAccessTuple, AppError> {
    Ok(DbAccessTuple {
        id: get_uuid(row, "id")?,
        principal_type: get_string(row, "principal_type")?,
        principal_id: get_uuid(row, "principal_id")?,
        resource_type: get_string(row, "resource_type")?,
        resource_id: get_uuid(row, "resource_id")?,
        role: get_string(row, "role")?,
        created_at: get_datetime(row, "created_at")?,
        updated_at: get_datetime(row, "updated_at")?,
    })
}

pub fn folder_from_row(row: &SqliteRow) -> Result<Folder, AppError> {
    Ok(Folder {
        id: get_uuid(row, "id")?,
        namespace_id: get_uuid(row, "namespace_id")?,
        name: get_string(row, "name")?,
        parent_folder_id: get_opt_uuid(row, "parent_folder_id")?,
        created_at: get_datetime(row, "created_at")?,
        updated_at: get_datetime(row, "updated_at")?,
    })
}

pub fn workflow_from_row(row: &SqliteRow) -> Result<Workflow, AppError> {
    Ok(Workflow {
        id: get_uuid(row, "id")?,
        namespace_id: get_uuid(row, "namespace_id")?,
        name: get_string(row, "name")?,
        parent_folder_id: get_opt_uuid(row, "parent_folder_id")?,
        created_at: get_datetime(row, "created_at")?,
        updated_at: get_datetime(row, "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_sqlite_timestamps() {
        let a = parse_datetime("2025-11-19T12:34:56Z").unwrap();
        let b = parse_datetime("2025-11-19 12:34:56").unwrap();
        assert_eq!(a, b);
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn uuid_errors_are_internal() {
        assert!(matches!(parse_uuid("not-a-uuid"), Err(AppError::Internal(_))));
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(&id.to_string()).unwrap(), id);
    }
}
