use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::response::{ApiError, ok};
use crate::types::PageType;

pub async fn list_tags(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.content.list_tags_with_counts()?))
}

pub async fn list_in_progress(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.content.list_in_progress()?))
}

pub(crate) fn parse_page_type(raw: &str) -> Result<PageType, ApiError> {
    PageType::parse(raw).ok_or_else(|| ApiError::not_found(format!("Unknown page: {raw}")))
}

pub async fn get_page(
    State(state): State<Arc<AppState>>,
    Path(page_type): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let page_type = parse_page_type(&page_type)?;
    Ok(ok(state.content.get_page(page_type)?))
}
