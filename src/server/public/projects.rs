use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::content::filter::parse_tag_param;
use crate::server::AppState;
use crate::server::dto::ProjectListParams;
use crate::server::response::{ApiError, ok};
use crate::types::ProjectStatus;

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProjectListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(|s| {
            ProjectStatus::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown project status: {s}")))
        })
        .transpose()?;

    let tags = parse_tag_param(params.tags.as_deref());
    let projects = state.content.list_projects(&tags, status)?;
    Ok(ok(projects))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.content.get_project_by_slug(&slug)?))
}

pub async fn related_projects(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.content.related_to_project(&slug)?))
}
