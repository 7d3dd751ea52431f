use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};

use crate::auth::RequireAdmin;
use crate::content::backup::{BackupImport, BackupScope, ExportFormat, render_markdown};
use crate::server::AppState;
use crate::server::dto::{BackupAck, BackupRequest, ImportResponse};
use crate::server::response::{ApiError, ok};

/// Exports the requested tables. `json` returns the document itself and
/// `markdown` a text rendering; any other format is acknowledged without a
/// body.
pub async fn export_backup(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<BackupRequest>,
) -> Result<Response, ApiError> {
    let scope = BackupScope::parse(&req.kind)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown backup type: {}", req.kind)))?;

    let Some(format) = ExportFormat::parse(&req.format) else {
        tracing::info!(format = %req.format, "backup requested in unsupported format");
        return Ok(Json(BackupAck {
            success: true,
            message: format!("Backup request received ({} / {})", req.kind, req.format),
        })
        .into_response());
    };

    let doc = state.content.export_backup(scope)?;
    tracing::info!(scope = %req.kind, format = %req.format, "backup exported");

    Ok(match format {
        ExportFormat::Json => Json(doc).into_response(),
        ExportFormat::Markdown => (
            [(CONTENT_TYPE, "text/markdown; charset=utf-8")],
            render_markdown(&doc),
        )
            .into_response(),
    })
}

pub async fn import_backup(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(doc): Json<BackupImport>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.content.import_backup(&doc)?;
    Ok(ok(ImportResponse {
        imported: summary.total(),
        summary,
    }))
}
