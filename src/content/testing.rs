//! Test doubles for the content layer.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;

use crate::error::{Error, Result};
use crate::store::{PostQuery, ProjectQuery, SqliteStore, Store};
use crate::types::*;

/// A real in-memory store that records every call and can be told to fail
/// specific operations. Operation names are the trait method names; link
/// operations are suffixed with the table, e.g. `insert_links:post_tags`.
pub(crate) struct FaultyStore {
    inner: SqliteStore,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        let inner = SqliteStore::open_in_memory().unwrap();
        inner.initialize().unwrap();
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(&self, op: &str) {
        self.failing.lock().unwrap().insert(op.to_string());
    }

    pub fn heal(&self, op: &str) {
        self.failing.lock().unwrap().remove(op);
    }

    pub fn was_called(&self, op: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == op)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn hit(&self, op: &str) -> Result<()> {
        self.calls.lock().unwrap().push(op.to_string());
        if self.failing.lock().unwrap().contains(op) {
            return Err(Error::Io(std::io::Error::other(format!(
                "injected failure: {op}"
            ))));
        }
        Ok(())
    }

    fn hit_link(&self, op: &str, table: LinkTable) -> Result<()> {
        self.hit(&format!("{op}:{}", table.table()))
    }
}

impl Store for FaultyStore {
    fn initialize(&self) -> Result<()> {
        self.inner.initialize()
    }

    fn insert_post(&self, post: &Post) -> Result<()> {
        self.hit("insert_post")?;
        self.inner.insert_post(post)
    }
    fn update_post(&self, post: &Post) -> Result<()> {
        self.hit("update_post")?;
        self.inner.update_post(post)
    }
    fn delete_post(&self, id: &str) -> Result<bool> {
        self.hit("delete_post")?;
        self.inner.delete_post(id)
    }
    fn get_post(&self, id: &str) -> Result<Option<Post>> {
        self.hit("get_post")?;
        self.inner.get_post(id)
    }
    fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        self.hit("get_post_by_slug")?;
        self.inner.get_post_by_slug(slug)
    }
    fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        self.hit("list_posts")?;
        self.inner.list_posts(query)
    }
    fn increment_post_views(&self, id: &str) -> Result<i64> {
        self.hit("increment_post_views")?;
        self.inner.increment_post_views(id)
    }
    fn upsert_post(&self, post: &Post) -> Result<()> {
        self.hit("upsert_post")?;
        self.inner.upsert_post(post)
    }

    fn insert_project(&self, project: &Project) -> Result<()> {
        self.hit("insert_project")?;
        self.inner.insert_project(project)
    }
    fn update_project(&self, project: &Project) -> Result<()> {
        self.hit("update_project")?;
        self.inner.update_project(project)
    }
    fn delete_project(&self, id: &str) -> Result<bool> {
        self.hit("delete_project")?;
        self.inner.delete_project(id)
    }
    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.hit("get_project")?;
        self.inner.get_project(id)
    }
    fn get_project_by_slug(&self, slug: &str) -> Result<Option<Project>> {
        self.hit("get_project_by_slug")?;
        self.inner.get_project_by_slug(slug)
    }
    fn list_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>> {
        self.hit("list_projects")?;
        self.inner.list_projects(query)
    }
    fn upsert_project(&self, project: &Project) -> Result<()> {
        self.hit("upsert_project")?;
        self.inner.upsert_project(project)
    }

    fn insert_tag(&self, tag: &Tag) -> Result<()> {
        self.hit("insert_tag")?;
        self.inner.insert_tag(tag)
    }
    fn update_tag(&self, tag: &Tag) -> Result<()> {
        self.hit("update_tag")?;
        self.inner.update_tag(tag)
    }
    fn delete_tag(&self, id: &str) -> Result<bool> {
        self.hit("delete_tag")?;
        self.inner.delete_tag(id)
    }
    fn get_tag(&self, id: &str) -> Result<Option<Tag>> {
        self.hit("get_tag")?;
        self.inner.get_tag(id)
    }
    fn get_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        self.hit("get_tag_by_slug")?;
        self.inner.get_tag_by_slug(slug)
    }
    fn list_tags(&self) -> Result<Vec<Tag>> {
        self.hit("list_tags")?;
        self.inner.list_tags()
    }
    fn list_tags_by_slugs(&self, slugs: &[String]) -> Result<Vec<Tag>> {
        self.hit("list_tags_by_slugs")?;
        self.inner.list_tags_by_slugs(slugs)
    }
    fn list_tags_by_ids(&self, ids: &[String]) -> Result<Vec<Tag>> {
        self.hit("list_tags_by_ids")?;
        self.inner.list_tags_by_ids(ids)
    }
    fn upsert_tag(&self, tag: &Tag) -> Result<()> {
        self.hit("upsert_tag")?;
        self.inner.upsert_tag(tag)
    }

    fn insert_in_progress(&self, item: &InProgress) -> Result<()> {
        self.hit("insert_in_progress")?;
        self.inner.insert_in_progress(item)
    }
    fn update_in_progress(&self, item: &InProgress) -> Result<()> {
        self.hit("update_in_progress")?;
        self.inner.update_in_progress(item)
    }
    fn delete_in_progress(&self, id: &str) -> Result<bool> {
        self.hit("delete_in_progress")?;
        self.inner.delete_in_progress(id)
    }
    fn get_in_progress(&self, id: &str) -> Result<Option<InProgress>> {
        self.hit("get_in_progress")?;
        self.inner.get_in_progress(id)
    }
    fn list_in_progress(&self) -> Result<Vec<InProgress>> {
        self.hit("list_in_progress")?;
        self.inner.list_in_progress()
    }
    fn upsert_in_progress(&self, item: &InProgress) -> Result<()> {
        self.hit("upsert_in_progress")?;
        self.inner.upsert_in_progress(item)
    }

    fn get_page(&self, page_type: PageType) -> Result<Option<Page>> {
        self.hit("get_page")?;
        self.inner.get_page(page_type)
    }
    fn list_pages(&self) -> Result<Vec<Page>> {
        self.hit("list_pages")?;
        self.inner.list_pages()
    }
    fn upsert_page(&self, page: &Page) -> Result<()> {
        self.hit("upsert_page")?;
        self.inner.upsert_page(page)
    }

    fn list_links(&self, table: LinkTable, owner_id: &str) -> Result<Vec<Link>> {
        self.hit_link("list_links", table)?;
        self.inner.list_links(table, owner_id)
    }
    fn list_links_by_targets(&self, table: LinkTable, target_ids: &[String]) -> Result<Vec<Link>> {
        self.hit_link("list_links_by_targets", table)?;
        self.inner.list_links_by_targets(table, target_ids)
    }
    fn list_all_links(&self, table: LinkTable) -> Result<Vec<Link>> {
        self.hit_link("list_all_links", table)?;
        self.inner.list_all_links(table)
    }
    fn count_links_by_target(&self, table: LinkTable) -> Result<HashMap<String, i64>> {
        self.hit_link("count_links_by_target", table)?;
        self.inner.count_links_by_target(table)
    }
    fn insert_links(&self, table: LinkTable, links: &[Link]) -> Result<()> {
        self.hit_link("insert_links", table)?;
        self.inner.insert_links(table, links)
    }
    fn delete_links(&self, table: LinkTable, owner_id: &str) -> Result<usize> {
        self.hit_link("delete_links", table)?;
        self.inner.delete_links(table, owner_id)
    }
    fn upsert_links(&self, table: LinkTable, links: &[Link]) -> Result<()> {
        self.hit_link("upsert_links", table)?;
        self.inner.upsert_links(table, links)
    }
}

pub fn seed_tag(store: &dyn Store, id: &str, slug: &str) -> Tag {
    let tag = Tag {
        id: id.to_string(),
        name: slug.to_string(),
        slug: slug.to_string(),
        description: None,
        color: None,
        created_at: Utc::now(),
    };
    store.insert_tag(&tag).unwrap();
    tag
}

pub fn seed_post(store: &dyn Store, id: &str, slug: &str, status: PostStatus) -> Post {
    let now = Utc::now();
    let post = Post {
        id: id.to_string(),
        title: format!("Post {slug}"),
        slug: slug.to_string(),
        content: json!({}),
        excerpt: Some(format!("About {slug}")),
        status,
        published_at: (status == PostStatus::Published).then_some(now),
        cover_image_url: None,
        ogp_image_url: None,
        view_count: 0,
        created_at: now,
        updated_at: now,
    };
    store.insert_post(&post).unwrap();
    post
}

pub fn seed_project(store: &dyn Store, id: &str, slug: &str) -> Project {
    let now = Utc::now();
    let project = Project {
        id: id.to_string(),
        title: format!("Project {slug}"),
        slug: slug.to_string(),
        description: None,
        content: json!({}),
        demo_url: None,
        github_url: None,
        cover_image_url: None,
        gallery_images: Vec::new(),
        start_date: None,
        end_date: None,
        status: ProjectStatus::Registered,
        steps_count: None,
        used_ai: Vec::new(),
        tech_stack: Default::default(),
        created_at: now,
        updated_at: now,
    };
    store.insert_project(&project).unwrap();
    project
}
