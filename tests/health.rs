use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::tempdir;
use tower::util::ServiceExt; // for `oneshot`

use folder_access::app::{router, AppState};
use folder_access::jwt::JwtConfig;

#[tokio::test]
async fn health_endpoint_reports_db_ok() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    folder_access::db::migrate(&pool).await?;

    let app = router(AppState::new(pool.clone(), JwtConfig::new("test-secret", 1)));

    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())?;

    let resp: Response = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK, "health endpoint did not return 200");

    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let v: Value = serde_json::from_slice(&body_bytes)?;
    let db_ok = v.get("db_ok").and_then(|b| b.as_bool()).unwrap_or(false);
    assert!(db_ok, "expected db_ok: true, got: {}", v);

    Ok(())
}

#[tokio::test]
async fn create_app_reads_jwt_secret_from_env() -> Result<()> {
    let dir = tempdir()?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("startup.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;
    folder_access::db::migrate(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = folder_access::create_app(pool).await?;

    let resp = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty())?)
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    Ok(())
}
