mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Filters for listing posts. Unset fields do not restrict the result.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// Only posts publicly visible at this instant.
    pub visible_at: Option<DateTime<Utc>>,
    pub status: Option<PostStatus>,
    pub ids: Option<Vec<String>>,
    pub limit: Option<i64>,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    pub status: Option<ProjectStatus>,
    pub ids: Option<Vec<String>>,
    pub limit: Option<i64>,
    pub offset: i64,
}

/// Store defines the database interface.
///
/// Every operation touches exactly one table in one statement. There is no
/// way to group calls into a transaction; multi-table writes are composed
/// by the content layer with compensating steps.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Post operations
    fn insert_post(&self, post: &Post) -> Result<()>;
    fn update_post(&self, post: &Post) -> Result<()>;
    fn delete_post(&self, id: &str) -> Result<bool>;
    fn get_post(&self, id: &str) -> Result<Option<Post>>;
    fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>>;
    fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>>;
    fn increment_post_views(&self, id: &str) -> Result<i64>;
    fn upsert_post(&self, post: &Post) -> Result<()>;

    // Project operations
    fn insert_project(&self, project: &Project) -> Result<()>;
    fn update_project(&self, project: &Project) -> Result<()>;
    fn delete_project(&self, id: &str) -> Result<bool>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    fn get_project_by_slug(&self, slug: &str) -> Result<Option<Project>>;
    fn list_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>>;
    fn upsert_project(&self, project: &Project) -> Result<()>;

    // Tag operations
    fn insert_tag(&self, tag: &Tag) -> Result<()>;
    fn update_tag(&self, tag: &Tag) -> Result<()>;
    fn delete_tag(&self, id: &str) -> Result<bool>;
    fn get_tag(&self, id: &str) -> Result<Option<Tag>>;
    fn get_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>>;
    fn list_tags(&self) -> Result<Vec<Tag>>;
    fn list_tags_by_slugs(&self, slugs: &[String]) -> Result<Vec<Tag>>;
    fn list_tags_by_ids(&self, ids: &[String]) -> Result<Vec<Tag>>;
    fn upsert_tag(&self, tag: &Tag) -> Result<()>;

    // In-progress operations
    fn insert_in_progress(&self, item: &InProgress) -> Result<()>;
    fn update_in_progress(&self, item: &InProgress) -> Result<()>;
    fn delete_in_progress(&self, id: &str) -> Result<bool>;
    fn get_in_progress(&self, id: &str) -> Result<Option<InProgress>>;
    fn list_in_progress(&self) -> Result<Vec<InProgress>>;
    fn upsert_in_progress(&self, item: &InProgress) -> Result<()>;

    // Singleton pages
    fn get_page(&self, page_type: PageType) -> Result<Option<Page>>;
    fn list_pages(&self) -> Result<Vec<Page>>;
    fn upsert_page(&self, page: &Page) -> Result<()>;

    // Link table operations (many-to-many edges)
    fn list_links(&self, table: LinkTable, owner_id: &str) -> Result<Vec<Link>>;
    fn list_links_by_targets(&self, table: LinkTable, target_ids: &[String]) -> Result<Vec<Link>>;
    fn list_all_links(&self, table: LinkTable) -> Result<Vec<Link>>;
    fn count_links_by_target(&self, table: LinkTable) -> Result<HashMap<String, i64>>;
    /// Inserts all rows in a single statement.
    fn insert_links(&self, table: LinkTable, links: &[Link]) -> Result<()>;
    fn delete_links(&self, table: LinkTable, owner_id: &str) -> Result<usize>;
    fn upsert_links(&self, table: LinkTable, links: &[Link]) -> Result<()>;
}
