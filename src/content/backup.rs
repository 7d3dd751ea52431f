//! Backup export and import.
//!
//! A backup is one JSON document holding every table as an array. Import
//! upserts table by table in dependency order, so importing the same
//! document twice is harmless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActionError, ActionResult, ContentService};
use crate::error::{Error, Result};
use crate::store::{PostQuery, ProjectQuery, Store};
use crate::types::{InProgress, Link, LinkTable, Page, Post, Project, Tag};

pub const BACKUP_VERSION: &str = "1.0";

/// Which tables an export covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupScope {
    #[default]
    Full,
    Posts,
    Projects,
    InProgress,
    Tags,
}

impl BackupScope {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Self::Full),
            "posts" => Some(Self::Posts),
            "projects" => Some(Self::Projects),
            "in_progress" => Some(Self::InProgress),
            "tags" => Some(Self::Tags),
            _ => None,
        }
    }

    fn includes_posts(self) -> bool {
        matches!(self, Self::Full | Self::Posts)
    }

    fn includes_projects(self) -> bool {
        matches!(self, Self::Full | Self::Projects)
    }

    fn includes_in_progress(self) -> bool {
        matches!(self, Self::Full | Self::InProgress)
    }

    fn includes_tags(self) -> bool {
        matches!(self, Self::Full | Self::Tags)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "json" => Some(Self::Json),
            "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

macro_rules! link_row {
    ($name:ident, $owner:ident, $target:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub $owner: String,
            pub $target: String,
        }

        impl From<Link> for $name {
            fn from(link: Link) -> Self {
                Self {
                    $owner: link.owner_id,
                    $target: link.target_id,
                }
            }
        }

        impl From<&$name> for Link {
            fn from(row: &$name) -> Self {
                Link::new(row.$owner.clone(), row.$target.clone())
            }
        }
    };
}

link_row!(PostTagRow, post_id, tag_id);
link_row!(ProjectTagRow, project_id, tag_id);
link_row!(PostLinkRow, post_id, related_post_id);
link_row!(PostProjectLinkRow, post_id, project_id);

/// Table arrays. A table outside the export scope is omitted rather than
/// written as an empty array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<Post>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress: Option<Vec<InProgress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_tags: Option<Vec<PostTagRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_tags: Option<Vec<ProjectTagRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_links: Option<Vec<PostLinkRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_project_links: Option<Vec<PostProjectLinkRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Page>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub data: BackupData,
}

/// A document as received for import; every field is checked by hand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupImport {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Option<BackupData>,
}

impl From<BackupDocument> for BackupImport {
    fn from(doc: BackupDocument) -> Self {
        Self {
            version: Some(doc.version),
            exported_at: Some(doc.exported_at),
            data: Some(doc.data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub count: usize,
}

/// Rows written per table, in import order. Tables absent from the
/// document are not listed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub tables: Vec<TableCount>,
}

impl ImportSummary {
    #[must_use]
    pub fn count(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.count)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.tables.iter().map(|t| t.count).sum()
    }

    fn record(&mut self, table: &'static str, count: usize) {
        tracing::debug!(table, count, "imported");
        self.tables.push(TableCount { table, count });
    }
}

fn links<R>(store: &dyn Store, table: LinkTable) -> Result<Vec<R>>
where
    R: From<Link>,
{
    Ok(store
        .list_all_links(table)?
        .into_iter()
        .map(R::from)
        .collect())
}

pub fn export(store: &dyn Store, scope: BackupScope) -> Result<BackupDocument> {
    let mut data = BackupData::default();

    if scope.includes_posts() {
        data.posts = Some(store.list_posts(&PostQuery::default())?);
        data.post_tags = Some(links(store, LinkTable::PostTags)?);
        data.post_links = Some(links(store, LinkTable::PostLinks)?);
        data.post_project_links = Some(links(store, LinkTable::PostProjectLinks)?);
    }
    if scope.includes_projects() {
        data.projects = Some(store.list_projects(&ProjectQuery::default())?);
        data.project_tags = Some(links(store, LinkTable::ProjectTags)?);
    }
    if scope.includes_in_progress() {
        data.in_progress = Some(store.list_in_progress()?);
    }
    if scope.includes_tags() {
        data.tags = Some(store.list_tags()?);
    }
    if scope == BackupScope::Full {
        data.pages = Some(store.list_pages()?);
    }

    Ok(BackupDocument {
        version: BACKUP_VERSION.to_string(),
        exported_at: Utc::now(),
        data,
    })
}

fn upsert_rows<T>(
    summary: &mut ImportSummary,
    table: &'static str,
    rows: Option<&[T]>,
    mut upsert: impl FnMut(&T) -> Result<()>,
) -> Result<()> {
    let Some(rows) = rows else {
        return Ok(());
    };
    for row in rows {
        upsert(row)?;
    }
    summary.record(table, rows.len());
    Ok(())
}

fn upsert_link_rows<'r, R>(
    store: &dyn Store,
    summary: &mut ImportSummary,
    table: LinkTable,
    rows: Option<&'r [R]>,
) -> Result<()>
where
    Link: From<&'r R>,
{
    let Some(rows) = rows else {
        return Ok(());
    };
    let links: Vec<Link> = rows.iter().map(Link::from).collect();
    store.upsert_links(table, &links)?;
    summary.record(table.table(), links.len());
    Ok(())
}

/// Upserts every table present in `doc`. Parents go before the link rows
/// that reference them.
pub fn import(store: &dyn Store, doc: &BackupImport) -> Result<ImportSummary> {
    let data = doc
        .data
        .as_ref()
        .ok_or_else(|| Error::InvalidBackup("missing data".to_string()))?;
    match doc.version.as_deref() {
        Some(BACKUP_VERSION) => {}
        Some(other) => tracing::warn!(version = other, "importing backup with unknown version"),
        None => tracing::warn!("importing backup without a version"),
    }

    let mut summary = ImportSummary::default();
    upsert_rows(&mut summary, "tags", data.tags.as_deref(), |t| store.upsert_tag(t))?;
    upsert_rows(&mut summary, "projects", data.projects.as_deref(), |p| {
        store.upsert_project(p)
    })?;
    upsert_rows(&mut summary, "posts", data.posts.as_deref(), |p| store.upsert_post(p))?;
    upsert_rows(&mut summary, "in_progress", data.in_progress.as_deref(), |i| {
        store.upsert_in_progress(i)
    })?;
    upsert_rows(&mut summary, "pages", data.pages.as_deref(), |p| store.upsert_page(p))?;
    upsert_link_rows(store, &mut summary, LinkTable::ProjectTags, data.project_tags.as_deref())?;
    upsert_link_rows(store, &mut summary, LinkTable::PostTags, data.post_tags.as_deref())?;
    upsert_link_rows(store, &mut summary, LinkTable::PostLinks, data.post_links.as_deref())?;
    upsert_link_rows(
        store,
        &mut summary,
        LinkTable::PostProjectLinks,
        data.post_project_links.as_deref(),
    )?;

    tracing::info!(rows = summary.total(), "backup imported");
    Ok(summary)
}

/// Plain-text rendering of the posts in a backup: a heading and the
/// excerpt per post.
#[must_use]
pub fn render_markdown(doc: &BackupDocument) -> String {
    doc.data
        .posts
        .iter()
        .flatten()
        .map(|post| {
            format!(
                "# {}\n\n{}\n",
                post.title,
                post.excerpt.as_deref().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl ContentService {
    pub fn export_backup(&self, scope: BackupScope) -> ActionResult<BackupDocument> {
        export(self.store.as_ref(), scope).map_err(|e| {
            tracing::error!(error = %e, "backup export failed");
            ActionError::Failed("Failed to export backup".to_string())
        })
    }

    pub fn import_backup(&self, doc: &BackupImport) -> ActionResult<ImportSummary> {
        let summary = import(self.store.as_ref(), doc).map_err(|e| match e {
            Error::InvalidBackup(_) => ActionError::Validation(e.to_string()),
            e => {
                tracing::error!(error = %e, "backup import failed");
                ActionError::Failed(format!("Failed to import backup: {e}"))
            }
        })?;

        let mut paths: Vec<String> = ["/", "/posts", "/projects", "/tags", "/progress"]
            .into_iter()
            .map(str::to_string)
            .collect();
        paths.extend(
            crate::types::PageType::ALL
                .iter()
                .map(|p| p.route().to_string())
                .filter(|route| route != "/"),
        );
        self.revalidate(&paths);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::content::testing::{FaultyStore, seed_post, seed_project, seed_tag};
    use crate::types::{PageType, PostStatus};

    fn seeded() -> FaultyStore {
        let store = FaultyStore::new();
        seed_tag(&store, "t1", "rust");
        seed_post(&store, "p1", "first", PostStatus::Published);
        seed_post(&store, "p2", "second", PostStatus::Draft);
        seed_project(&store, "pr1", "tool");
        store
            .insert_links(LinkTable::PostTags, &[Link::new("p1", "t1")])
            .unwrap();
        store
            .insert_links(LinkTable::ProjectTags, &[Link::new("pr1", "t1")])
            .unwrap();
        store
            .insert_links(LinkTable::PostLinks, &[Link::new("p1", "p2")])
            .unwrap();
        store
            .insert_links(LinkTable::PostProjectLinks, &[Link::new("p1", "pr1")])
            .unwrap();
        store
            .upsert_page(&Page {
                id: "home".to_string(),
                page_type: PageType::Home,
                content: json!({}),
                metadata: json!({"hero": "hi"}),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_full_export_into_empty_store() {
        let source = seeded();
        let doc = export(&source, BackupScope::Full).unwrap();
        assert_eq!(doc.version, BACKUP_VERSION);

        let text = serde_json::to_string(&doc).unwrap();
        let parsed: BackupImport = serde_json::from_str(&text).unwrap();

        let target = FaultyStore::new();
        let summary = import(&target, &parsed).unwrap();
        let order: Vec<&str> = summary.tables.iter().map(|t| t.table).collect();
        assert_eq!(
            order,
            vec![
                "tags",
                "projects",
                "posts",
                "in_progress",
                "pages",
                "project_tags",
                "post_tags",
                "post_links",
                "post_project_links",
            ]
        );
        assert_eq!(summary.count("posts"), Some(2));
        assert_eq!(target.list_links(LinkTable::PostLinks, "p1").unwrap().len(), 1);
        assert_eq!(
            target.get_page(PageType::Home).unwrap().unwrap().metadata["hero"],
            "hi"
        );

        // Importing again only rewrites the same rows.
        import(&target, &parsed).unwrap();
        assert_eq!(target.list_all_links(LinkTable::PostTags).unwrap().len(), 1);
        assert_eq!(target.list_tags().unwrap().len(), 1);
    }

    #[test]
    fn test_scoped_export_omits_other_tables() {
        let store = seeded();
        let doc = export(&store, BackupScope::Projects).unwrap();
        assert_eq!(doc.data.projects.as_ref().map(Vec::len), Some(1));
        assert_eq!(doc.data.project_tags.as_ref().map(Vec::len), Some(1));
        assert!(doc.data.posts.is_none());
        assert!(doc.data.pages.is_none());

        let value = serde_json::to_value(&doc).unwrap();
        assert!(value["data"].get("posts").is_none());
        assert_eq!(value["data"]["project_tags"][0]["project_id"], "pr1");
    }

    #[test]
    fn test_import_requires_data() {
        let store = FaultyStore::new();
        let doc: BackupImport = serde_json::from_value(json!({"version": "1.0"})).unwrap();
        let err = import(&store, &doc).unwrap_err();
        assert_eq!(err.to_string(), "Invalid backup file: missing data");
        assert!(!store.was_called("upsert_tag"));
    }

    #[test]
    fn test_import_skips_absent_tables() {
        let store = FaultyStore::new();
        let doc: BackupImport = serde_json::from_value(json!({
            "version": "1.0",
            "data": {
                "tags": [{
                    "id": "t9",
                    "name": "Go",
                    "slug": "go",
                    "created_at": "2024-01-01T00:00:00Z"
                }]
            }
        }))
        .unwrap();

        let summary = import(&store, &doc).unwrap();
        assert_eq!(summary.tables.len(), 1);
        assert_eq!(summary.count("tags"), Some(1));
        assert!(!store.was_called("upsert_links:post_tags"));
    }

    #[test]
    fn test_markdown_rendering() {
        let store = seeded();
        let doc = export(&store, BackupScope::Posts).unwrap();
        let markdown = render_markdown(&doc);
        assert!(markdown.contains("# Post first\n\nAbout first\n"));
        assert!(markdown.contains("# Post second\n\nAbout second\n"));

        let tags_only = export(&store, BackupScope::Tags).unwrap();
        assert_eq!(render_markdown(&tags_only), "");
    }
}
