mod backup;
mod pages;
mod posts;
mod progress;
mod projects;
mod tags;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::PostStatus;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Post routes
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        // Project routes
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        // Tag routes
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/{id}", put(tags::update_tag).delete(tags::delete_tag))
        // In-progress routes
        .route(
            "/in-progress",
            get(progress::list_in_progress).post(progress::create_in_progress),
        )
        .route(
            "/in-progress/{id}",
            put(progress::update_in_progress).delete(progress::delete_in_progress),
        )
        .route(
            "/in-progress/{id}/complete",
            post(progress::complete_in_progress),
        )
        // Singleton pages
        .route("/pages/{page_type}", put(pages::save_page))
        // Backup
        .route("/backup", post(backup::export_backup))
        .route("/import", post(backup::import_backup))
}

fn parse_post_status(raw: Option<&str>) -> Result<Option<PostStatus>, ApiError> {
    raw.map(|s| {
        PostStatus::parse(s).ok_or_else(|| ApiError::bad_request(format!("Unknown post status: {s}")))
    })
    .transpose()
}
