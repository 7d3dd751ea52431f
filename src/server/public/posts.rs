use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::content::filter::parse_tag_param;
use crate::server::AppState;
use crate::server::dto::PostListParams;
use crate::server::response::{ApiError, ok};

const MAX_PAGE_SIZE: i64 = 100;

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = match params.limit {
        Some(limit) if !(1..=MAX_PAGE_SIZE).contains(&limit) => {
            return Err(ApiError::bad_request(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        limit => limit,
    };
    let offset = params.offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::bad_request("offset must not be negative"));
    }

    let tags = parse_tag_param(params.tags.as_deref());
    let posts = state.content.list_published_posts(&tags, limit, offset)?;
    Ok(ok(posts))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.content.read_published_post(&slug)?;
    Ok(ok(post))
}

pub async fn related_posts(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let related = state.content.related_to_post(&slug)?;
    Ok(ok(related))
}
