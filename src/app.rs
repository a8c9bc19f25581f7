use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{access, folders, health, workflows};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    Ok(router(AppState::new(pool, jwt_config)))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(Any)
        .allow_headers(Any);

    let access_routes = Router::new()
        .route("/grant", post(access::grant_access))
        .route("/revoke", axum::routing::delete(access::revoke_access))
        .route(
            "/role",
            get(access::get_effective_role).patch(access::update_access_role),
        )
        .route("/resources", get(access::list_accessible_resources))
        .route("/principals", get(access::list_resource_principals))
        .route(
            "/providers/:id/users",
            get(access::list_provider_users).post(access::grant_provider_user),
        )
        .route(
            "/providers/:id/users/:user_id",
            axum::routing::patch(access::update_provider_user).delete(access::revoke_provider_user),
        );

    let folder_routes = Router::new()
        .route("/", get(folders::list_folders).post(folders::create_folder))
        .route(
            "/:id",
            get(folders::get_folder)
                .patch(folders::update_folder)
                .delete(folders::delete_folder),
        )
        .route("/:id/path", get(folders::get_folder_path));

    let workflow_routes = Router::new()
        .route("/", post(workflows::create_workflow))
        .route(
            "/:id",
            get(workflows::get_workflow)
                .patch(workflows::move_workflow)
                .delete(workflows::delete_workflow),
        );

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/access", access_routes)
        .nest("/folders", folder_routes)
        .nest("/workflows", workflow_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
