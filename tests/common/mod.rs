#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use folder_access::app::{router, AppState};
use folder_access::authz::{hierarchy, tuples, Principal, Resource, Role};
use folder_access::jwt::JwtConfig;

pub const TEST_SECRET: &str = "test_secret";

pub fn jwt() -> JwtConfig {
    JwtConfig::new(TEST_SECRET, 1)
}

pub fn app(pool: &SqlitePool) -> Router {
    router(AppState::new(pool.clone(), jwt()))
}

pub fn token(principal: Principal) -> String {
    jwt().encode(principal).unwrap()
}

pub async fn seed_user(pool: &SqlitePool, email: &str) -> Principal {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(email)
        .bind(email.split('@').next())
        .bind(chrono::Utc::now())
        .execute(pool)
        .await
        .unwrap();
    Principal::user(id)
}

pub async fn seed_service_account(pool: &SqlitePool, namespace_id: Uuid, name: &str) -> Principal {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO service_accounts (id, namespace_id, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(namespace_id.to_string())
        .bind(name)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await
        .unwrap();
    Principal::service_account(id)
}

pub async fn seed_provider(pool: &SqlitePool, namespace_id: Uuid, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO providers (id, namespace_id, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(namespace_id.to_string())
        .bind(name)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn folder(pool: &SqlitePool, namespace_id: Uuid, name: &str, parent: Option<Uuid>) -> Uuid {
    let mut conn = pool.acquire().await.unwrap();
    hierarchy::create_folder(&mut conn, namespace_id, name, parent)
        .await
        .unwrap()
        .id
}

pub async fn workflow(pool: &SqlitePool, namespace_id: Uuid, name: &str, parent: Option<Uuid>) -> Uuid {
    let mut conn = pool.acquire().await.unwrap();
    hierarchy::create_workflow(&mut conn, namespace_id, name, parent)
        .await
        .unwrap()
        .id
}

pub async fn grant_direct(pool: &SqlitePool, principal: Principal, resource: Resource, role: Role) {
    let mut conn = pool.acquire().await.unwrap();
    tuples::upsert(&mut conn, principal, resource, role).await.unwrap();
}

/// Folders `A -> B -> C` with workflow `W` inside `C`.
pub struct Chain {
    pub namespace_id: Uuid,
    pub a: Uuid,
    pub b: Uuid,
    pub c: Uuid,
    pub w: Uuid,
}

pub async fn chain(pool: &SqlitePool) -> Chain {
    let namespace_id = Uuid::new_v4();
    let a = folder(pool, namespace_id, "A", None).await;
    let b = folder(pool, namespace_id, "B", Some(a)).await;
    let c = folder(pool, namespace_id, "C", Some(b)).await;
    let w = workflow(pool, namespace_id, "W", Some(c)).await;
    Chain {
        namespace_id,
        a,
        b,
        c,
        w,
    }
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}
