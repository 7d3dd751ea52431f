use serde::{Deserialize, Serialize};

use crate::content::backup::ImportSummary;
use crate::types::{InProgress, Page, PostWithRelations, ProjectWithTags};

#[derive(Debug, Default, Deserialize)]
pub struct PostListParams {
    /// Comma separated tag slugs; every one must match.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListParams {
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusParams {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BackupRequest {
    #[serde(rename = "type", default = "default_backup_type")]
    pub kind: String,
    #[serde(default = "default_backup_format")]
    pub format: String,
}

fn default_backup_type() -> String {
    "full".to_string()
}

fn default_backup_format() -> String {
    "json".to_string()
}

/// Plain acknowledgement for backup formats without a body of their own.
#[derive(Debug, Serialize)]
pub struct BackupAck {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    #[serde(flatten)]
    pub summary: ImportSummary,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub page: Option<Page>,
    pub latest_posts: Vec<PostWithRelations>,
    pub projects: Vec<ProjectWithTags>,
    pub in_progress: Vec<InProgress>,
}
