use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::content::ProjectInput;
use crate::server::AppState;
use crate::server::dto::StatusParams;
use crate::server::response::{ApiError, ok};
use crate::types::ProjectStatus;

pub async fn list_projects(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatusParams>,
) -> impl IntoResponse {
    let status = match params.status.as_deref() {
        Some(s) => Some(
            ProjectStatus::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown project status: {s}")))?,
        ),
        None => None,
    };
    let projects = state.content.list_projects(&[], status)?;
    Ok::<_, ApiError>(ok(projects))
}

pub async fn get_project(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    Ok::<_, ApiError>(ok(state.content.get_project(&id)?))
}

pub async fn create_project(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProjectInput>,
) -> impl IntoResponse {
    let project = state.content.create_project(req)?;
    Ok::<_, ApiError>((StatusCode::CREATED, ok(project)))
}

pub async fn update_project(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ProjectInput>,
) -> impl IntoResponse {
    Ok::<_, ApiError>(ok(state.content.update_project(&id, req)?))
}

pub async fn delete_project(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.content.delete_project(&id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
