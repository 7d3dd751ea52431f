use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::content::TagInput;
use crate::server::AppState;
use crate::server::response::{ApiError, ok};

pub async fn list_tags(_admin: RequireAdmin, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Ok::<_, ApiError>(ok(state.content.list_tags_with_counts()?))
}

pub async fn create_tag(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<TagInput>,
) -> impl IntoResponse {
    let tag = state.content.create_tag(req)?;
    Ok::<_, ApiError>((StatusCode::CREATED, ok(tag)))
}

pub async fn update_tag(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TagInput>,
) -> impl IntoResponse {
    Ok::<_, ApiError>(ok(state.content.update_tag(&id, req)?))
}

pub async fn delete_tag(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.content.delete_tag(&id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
