use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::content::InProgressInput;
use crate::server::AppState;
use crate::server::dto::CompleteRequest;
use crate::server::response::{ApiError, ok};

pub async fn list_in_progress(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Ok::<_, ApiError>(ok(state.content.list_in_progress()?))
}

pub async fn create_in_progress(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<InProgressInput>,
) -> impl IntoResponse {
    let item = state.content.create_in_progress(req)?;
    Ok::<_, ApiError>((StatusCode::CREATED, ok(item)))
}

pub async fn update_in_progress(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<InProgressInput>,
) -> impl IntoResponse {
    Ok::<_, ApiError>(ok(state.content.update_in_progress(&id, req)?))
}

pub async fn delete_in_progress(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.content.delete_in_progress(&id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

// The body is optional; an empty request completes without a project.
pub async fn complete_in_progress(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    req: Option<Json<CompleteRequest>>,
) -> impl IntoResponse {
    let project_id = req.and_then(|Json(r)| r.project_id);
    Ok::<_, ApiError>(ok(state.content.complete_in_progress(&id, project_id)?))
}
