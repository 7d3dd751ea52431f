use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{PageType, PostStatus, ProgressStatus, ProjectStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ogp_image_url: Option<String>,
    #[serde(default)]
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Whether the post may be shown on public routes at `now`.
    #[must_use]
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            PostStatus::Published => true,
            PostStatus::Scheduled => self.published_at.is_some_and(|at| at <= now),
            PostStatus::Draft => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub gallery_images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps_count: Option<i32>,
    #[serde(default)]
    pub used_ai: Vec<String>,
    /// Language name to share of the codebase, in percent.
    #[serde(default)]
    pub tech_stack: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCounts {
    #[serde(flatten)]
    pub tag: Tag,
    pub post_count: i64,
    pub project_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InProgress {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ProgressStatus,
    pub progress_rate: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_project_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub page_type: PageType,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A many-to-many table. Each row is a directed (owner, target) edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkTable {
    PostTags,
    ProjectTags,
    PostLinks,
    PostProjectLinks,
}

impl LinkTable {
    pub const ALL: [LinkTable; 4] = [
        LinkTable::PostTags,
        LinkTable::ProjectTags,
        LinkTable::PostLinks,
        LinkTable::PostProjectLinks,
    ];

    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::PostTags => "post_tags",
            Self::ProjectTags => "project_tags",
            Self::PostLinks => "post_links",
            Self::PostProjectLinks => "post_project_links",
        }
    }

    #[must_use]
    pub const fn owner_column(self) -> &'static str {
        match self {
            Self::PostTags | Self::PostLinks | Self::PostProjectLinks => "post_id",
            Self::ProjectTags => "project_id",
        }
    }

    #[must_use]
    pub const fn target_column(self) -> &'static str {
        match self {
            Self::PostTags | Self::ProjectTags => "tag_id",
            Self::PostLinks => "related_post_id",
            Self::PostProjectLinks => "project_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub owner_id: String,
    pub target_id: String,
}

impl Link {
    pub fn new(owner_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            target_id: target_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostWithRelations {
    #[serde(flatten)]
    pub post: Post,
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_post_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_project_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithTags {
    #[serde(flatten)]
    pub project: Project,
    pub tags: Vec<Tag>,
}
