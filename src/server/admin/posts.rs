use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::parse_post_status;
use crate::auth::RequireAdmin;
use crate::content::PostInput;
use crate::server::AppState;
use crate::server::dto::StatusParams;
use crate::server::response::{ApiError, ok};

pub async fn list_posts(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatusParams>,
) -> impl IntoResponse {
    let status = parse_post_status(params.status.as_deref())?;
    let posts = state.content.list_posts(status)?;
    Ok::<_, ApiError>(ok(posts))
}

pub async fn get_post(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    Ok::<_, ApiError>(ok(state.content.get_post(&id)?))
}

pub async fn create_post(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PostInput>,
) -> impl IntoResponse {
    let post = state.content.create_post(req)?;
    Ok::<_, ApiError>((StatusCode::CREATED, ok(post)))
}

pub async fn update_post(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PostInput>,
) -> impl IntoResponse {
    Ok::<_, ApiError>(ok(state.content.update_post(&id, req)?))
}

pub async fn delete_post(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.content.delete_post(&id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
