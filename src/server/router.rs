use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::public::public_router;
use crate::content::ContentService;

pub struct AppState {
    pub content: Arc<ContentService>,
    /// SHA-256 hex digest of the admin token. `None` disables the admin API.
    pub admin_token_digest: Option<String>,
}

impl AppState {
    #[must_use]
    pub fn new(content: ContentService, admin_token_digest: Option<String>) -> Self {
        Self {
            content: Arc::new(content),
            admin_token_digest,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/admin", admin_router())
        .nest("/api", public_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
