use std::sync::Arc;

use axum::{extract::State, response::IntoResponse};

use crate::content::{ActionError, ActionResult, ContentService};
use crate::server::AppState;
use crate::server::dto::HomeResponse;
use crate::server::response::{ApiError, ok};
use crate::types::{PageType, ProgressStatus};

const LATEST_POSTS: i64 = 5;
const FEATURED_PROJECTS: usize = 6;

/// Runs one synchronous content read on the blocking pool.
async fn blocking<T, F>(content: &Arc<ContentService>, read: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ContentService) -> ActionResult<T> + Send + 'static,
{
    let content = Arc::clone(content);
    tokio::task::spawn_blocking(move || read(&content))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "home read task failed");
            ApiError::internal("Failed to load home page")
        })?
        .map_err(ApiError::from)
}

/// Everything the landing page shows, read concurrently.
pub async fn home(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let content = &state.content;

    let (page, latest_posts, projects, in_progress) = tokio::try_join!(
        blocking(content, |c| match c.get_page(PageType::Home) {
            Ok(page) => Ok(Some(page)),
            Err(ActionError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }),
        blocking(content, |c| c.list_published_posts(&[], Some(LATEST_POSTS), 0)),
        blocking(content, |c| {
            let mut projects = c.list_projects(&[], None)?;
            projects.truncate(FEATURED_PROJECTS);
            Ok(projects)
        }),
        blocking(content, |c| {
            let mut items = c.list_in_progress()?;
            items.retain(|i| i.status != ProgressStatus::Completed);
            Ok(items)
        }),
    )?;

    Ok(ok(HomeResponse {
        page,
        latest_posts,
        projects,
        in_progress,
    }))
}
