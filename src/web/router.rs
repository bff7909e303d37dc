//! Router configuration for the Web API.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_file, list_files, login, register, resolve_share, search_files, share_file,
    upload_file, AppState,
};
use super::middleware::{jwt_auth, JwtState};

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, jwt_state: Arc<JwtState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login));

    let file_routes = Router::new()
        .route("/", post(upload_file).get(list_files))
        .route("/search", get(search_files))
        .route("/:id/share", post(share_file))
        .route("/:id", delete(delete_file));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/files", file_routes);

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .route("/share/:token", get(resolve_share))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer())
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a router serving locally stored uploads under /uploads.
///
/// Only mounted for the local storage backend; object store backends
/// hand out presigned URLs instead.
pub fn create_uploads_router(root: &Path) -> Router {
    Router::new().nest_service("/uploads", ServeDir::new(root))
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Permissive CORS for browser clients.
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any)
}
