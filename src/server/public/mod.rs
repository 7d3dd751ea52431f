mod home;
mod posts;
mod projects;
mod site;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::server::AppState;

pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/home", get(home::home))
        // Posts
        .route("/posts", get(posts::list_posts))
        .route("/posts/{slug}", get(posts::get_post))
        .route("/posts/{slug}/related", get(posts::related_posts))
        // Projects
        .route("/projects", get(projects::list_projects))
        .route("/projects/{slug}", get(projects::get_project))
        .route("/projects/{slug}/related", get(projects::related_projects))
        // Everything else on the site
        .route("/tags", get(site::list_tags))
        .route("/in-progress", get(site::list_in_progress))
        .route("/pages/{page_type}", get(site::get_page))
}
