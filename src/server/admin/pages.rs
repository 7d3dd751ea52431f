use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::content::PageInput;
use crate::server::AppState;
use crate::server::response::{ApiError, ok};
use crate::types::PageType;

pub async fn save_page(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(page_type): Path<String>,
    Json(req): Json<PageInput>,
) -> impl IntoResponse {
    let page_type = PageType::parse(&page_type)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown page type: {page_type}")))?;
    Ok::<_, ApiError>(ok(state.content.save_page(page_type, req)?))
}
