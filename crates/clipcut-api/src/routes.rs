//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::categories::get_video_categories;
use crate::handlers::collections::create_collection;
use crate::handlers::downloads::{download_clip, download_collection};
use crate::handlers::health::health;
use crate::handlers::projects::{
    delete_project, get_project, get_status, list_projects, process_project, retry_project,
    upload_project,
};
use crate::state::AppState;

/// Uploads are whole long-form videos.
const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let project_routes = Router::new()
        .route("/projects/upload", post(upload_project))
        .route("/projects", get(list_projects))
        .route("/projects/:project_id", get(get_project))
        .route("/projects/:project_id", delete(delete_project))
        .route("/projects/:project_id/process", post(process_project))
        .route("/projects/:project_id/retry", post(retry_project))
        .route("/projects/:project_id/status", get(get_status))
        .route("/projects/:project_id/clips/:clip_id/download", get(download_clip))
        .route(
            "/projects/:project_id/collections/:collection_id/download",
            get(download_collection),
        )
        .route("/projects/:project_id/collections", post(create_collection));

    let api_routes = Router::new()
        .merge(project_routes)
        .route("/video-categories", get(get_video_categories));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
