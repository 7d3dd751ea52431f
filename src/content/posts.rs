use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::filter::{TagMatch, owners_with_all_tags};
use super::saga::Saga;
use super::validation::validate_post;
use super::{
    ActionError, ActionResult, ContentService, StoreResultExt, dedup_ids, linked_tags,
    parent_write_failed, rolled_back,
};
use crate::store::{PostQuery, Store};
use crate::types::{Link, LinkTable, Post, PostStatus, PostWithRelations};

const DUPLICATE_SLUG: &str = "A post with this slug already exists";

/// Author-supplied fields of a post. Link sets left as `None` are not
/// touched on update; `Some(vec![])` clears them.
#[derive(Debug, Clone, Deserialize)]
pub struct PostInput {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub ogp_image_url: Option<String>,
    #[serde(default)]
    pub tag_ids: Option<Vec<String>>,
    #[serde(default)]
    pub related_post_ids: Option<Vec<String>>,
    #[serde(default)]
    pub related_project_ids: Option<Vec<String>>,
}

impl PostInput {
    /// The link sets this input specifies, in write order.
    fn link_sets(&self, post_id: &str) -> Vec<(LinkTable, Vec<Link>)> {
        [
            (LinkTable::PostTags, &self.tag_ids),
            (LinkTable::PostLinks, &self.related_post_ids),
            (LinkTable::PostProjectLinks, &self.related_project_ids),
        ]
        .into_iter()
        .filter_map(|(table, ids)| {
            let ids = ids.as_ref()?;
            let links = dedup_ids(ids)
                .into_iter()
                .map(|target| Link::new(post_id, target))
                .collect();
            Some((table, links))
        })
        .collect()
    }
}

/// Published posts keep their first publication date; publishing without
/// one stamps the current time.
fn resolve_published_at(
    status: PostStatus,
    requested: Option<DateTime<Utc>>,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match status {
        PostStatus::Published => requested.or(previous).or(Some(now)),
        PostStatus::Scheduled | PostStatus::Draft => requested,
    }
}

fn normalize_content(content: serde_json::Value) -> serde_json::Value {
    if content.is_null() {
        serde_json::json!({})
    } else {
        content
    }
}

fn post_paths(slug: &str) -> Vec<String> {
    vec![
        "/".to_string(),
        "/posts".to_string(),
        format!("/posts/{slug}"),
    ]
}

impl ContentService {
    pub fn create_post(&self, input: PostInput) -> ActionResult<PostWithRelations> {
        validate_post(&input)?;

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4().to_string(),
            title: input.title.trim().to_string(),
            slug: input.slug.clone(),
            content: normalize_content(input.content.clone()),
            excerpt: input.excerpt.clone(),
            status: input.status,
            published_at: resolve_published_at(input.status, input.published_at, None, now),
            cover_image_url: input.cover_image_url.clone(),
            ogp_image_url: input.ogp_image_url.clone(),
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        let link_sets = input.link_sets(&post.id);
        let store = self.store.as_ref();
        let post_id = post.id.as_str();

        let mut saga = Saga::new("create_post");
        saga.step(
            "insert post",
            || store.insert_post(&post),
            || store.delete_post(&post.id).map(|_| ()),
        )
        .map_err(|e| parent_write_failed(e, DUPLICATE_SLUG, "Failed to create post"))?;

        for (table, links) in &link_sets {
            let table = *table;
            saga.step(
                format!("insert {}", table.table()),
                || store.insert_links(table, links),
                move || store.delete_links(table, post_id).map(|_| ()),
            )
            .map_err(|e| rolled_back(e, "Failed to save the post's links."))?;
        }
        saga.commit();

        tracing::info!(post_id = %post.id, slug = %post.slug, "post created");
        self.revalidate(&post_paths(&post.slug));
        self.post_with_relations(post)
    }

    pub fn update_post(&self, id: &str, input: PostInput) -> ActionResult<PostWithRelations> {
        validate_post(&input)?;
        if input
            .related_post_ids
            .as_ref()
            .is_some_and(|ids| ids.iter().any(|r| r == id))
        {
            return Err(ActionError::Validation(
                "related_post_ids: a post cannot be related to itself".to_string(),
            ));
        }

        let store = self.store.as_ref();
        let previous = store
            .get_post(id)
            .or_fail("Failed to load post")?
            .ok_or_else(|| ActionError::NotFound("Post not found".to_string()))?;

        let now = Utc::now();
        let updated = Post {
            id: previous.id.clone(),
            title: input.title.trim().to_string(),
            slug: input.slug.clone(),
            content: normalize_content(input.content.clone()),
            excerpt: input.excerpt.clone(),
            status: input.status,
            published_at: resolve_published_at(
                input.status,
                input.published_at,
                previous.published_at,
                now,
            ),
            cover_image_url: input.cover_image_url.clone(),
            ogp_image_url: input.ogp_image_url.clone(),
            view_count: previous.view_count,
            created_at: previous.created_at,
            updated_at: now,
        };
        let link_sets = input.link_sets(id);

        let mut saga = Saga::new("update_post");
        saga.step(
            "update post",
            || store.update_post(&updated),
            || store.update_post(&previous),
        )
        .map_err(|e| parent_write_failed(e, DUPLICATE_SLUG, "Failed to update post"))?;

        for (table, links) in &link_sets {
            replace_links(&mut saga, store, *table, id, links)
                .map_err(|e| rolled_back(e, "Failed to update the post's links."))?;
        }
        saga.commit();

        tracing::info!(post_id = %id, slug = %updated.slug, "post updated");
        let mut paths = post_paths(&updated.slug);
        if previous.slug != updated.slug {
            paths.push(format!("/posts/{}", previous.slug));
        }
        self.revalidate(&paths);
        self.post_with_relations(updated)
    }

    pub fn delete_post(&self, id: &str) -> ActionResult<()> {
        let store = self.store.as_ref();
        let post = store
            .get_post(id)
            .or_fail("Failed to load post")?
            .ok_or_else(|| ActionError::NotFound("Post not found".to_string()))?;

        if !store.delete_post(id).or_fail("Failed to delete post")? {
            return Err(ActionError::NotFound("Post not found".to_string()));
        }

        tracing::info!(post_id = %id, "post deleted");
        self.revalidate(&post_paths(&post.slug));
        Ok(())
    }

    pub fn get_post(&self, id: &str) -> ActionResult<PostWithRelations> {
        let post = self
            .store
            .get_post(id)
            .or_fail("Failed to load post")?
            .ok_or_else(|| ActionError::NotFound("Post not found".to_string()))?;
        self.post_with_relations(post)
    }

    /// Admin listing: every post, optionally narrowed to one status.
    pub fn list_posts(&self, status: Option<PostStatus>) -> ActionResult<Vec<PostWithRelations>> {
        let posts = self
            .store
            .list_posts(&PostQuery {
                status,
                ..Default::default()
            })
            .or_fail("Failed to list posts")?;
        self.attach_post_tags(posts)
    }

    /// Public listing: visible posts carrying every tag in `tag_slugs`.
    pub fn list_published_posts(
        &self,
        tag_slugs: &[String],
        limit: Option<i64>,
        offset: i64,
    ) -> ActionResult<Vec<PostWithRelations>> {
        let store = self.store.as_ref();
        let ids = match owners_with_all_tags(store, LinkTable::PostTags, tag_slugs)
            .or_fail("Failed to filter posts by tag")?
        {
            TagMatch::Owners(ids) if ids.is_empty() => return Ok(Vec::new()),
            matched => matched.into_ids(),
        };

        let posts = store
            .list_posts(&PostQuery {
                visible_at: Some(Utc::now()),
                ids,
                limit,
                offset,
                ..Default::default()
            })
            .or_fail("Failed to list posts")?;
        self.attach_post_tags(posts)
    }

    /// Public detail read. Counts a view when the post is visible.
    pub fn read_published_post(&self, slug: &str) -> ActionResult<PostWithRelations> {
        let store = self.store.as_ref();
        let mut post = store
            .get_post_by_slug(slug)
            .or_fail("Failed to load post")?
            .filter(|p| p.is_visible_at(Utc::now()))
            .ok_or_else(|| ActionError::NotFound("Post not found".to_string()))?;

        match store.increment_post_views(&post.id) {
            Ok(count) => post.view_count = count,
            Err(e) => tracing::warn!(post_id = %post.id, error = %e, "failed to record view"),
        }
        self.post_with_relations(post)
    }

    pub(crate) fn post_with_relations(&self, post: Post) -> ActionResult<PostWithRelations> {
        let store = self.store.as_ref();
        let tag_ids = targets(store.list_links(LinkTable::PostTags, &post.id))
            .or_fail("Failed to load post tags")?;
        let tags = store
            .list_tags_by_ids(&tag_ids)
            .or_fail("Failed to load post tags")?;
        let related_post_ids = targets(store.list_links(LinkTable::PostLinks, &post.id))
            .or_fail("Failed to load related posts")?;
        let related_project_ids = targets(store.list_links(LinkTable::PostProjectLinks, &post.id))
            .or_fail("Failed to load related projects")?;

        Ok(PostWithRelations {
            post,
            tags,
            related_post_ids,
            related_project_ids,
        })
    }

    fn attach_post_tags(&self, posts: Vec<Post>) -> ActionResult<Vec<PostWithRelations>> {
        let store = self.store.as_ref();
        let all_tags = store.list_tags().or_fail("Failed to load tags")?;

        posts
            .into_iter()
            .map(|post| {
                let links = store
                    .list_links(LinkTable::PostTags, &post.id)
                    .or_fail("Failed to load post tags")?;
                let tags = linked_tags(&all_tags, &links);
                Ok(PostWithRelations {
                    post,
                    tags,
                    related_post_ids: Vec::new(),
                    related_project_ids: Vec::new(),
                })
            })
            .collect()
    }
}

fn targets(links: crate::error::Result<Vec<Link>>) -> crate::error::Result<Vec<String>> {
    links.map(|links| links.into_iter().map(|l| l.target_id).collect())
}

/// Replaces every link row of `owner_id` in `table` as two compensated
/// steps: delete (undo: restore the previous rows) then insert (undo:
/// delete the new rows).
pub(super) fn replace_links<'a>(
    saga: &mut Saga<'a>,
    store: &'a dyn Store,
    table: LinkTable,
    owner_id: &'a str,
    links: &'a [Link],
) -> Result<(), super::saga::StepFailed> {
    let previous = saga.run(format!("snapshot {}", table.table()), || {
        store.list_links(table, owner_id)
    })?;

    saga.step(
        format!("clear {}", table.table()),
        || store.delete_links(table, owner_id).map(|_| ()),
        move || store.upsert_links(table, &previous),
    )?;

    saga.step(
        format!("insert {}", table.table()),
        || store.insert_links(table, links),
        move || store.delete_links(table, owner_id).map(|_| ()),
    )?;
    Ok(())
}
