//! Related-content selection.
//!
//! Explicit links win when an author set them. Otherwise candidates are
//! ranked by how many tags they share with the subject; a few are drawn at
//! random from the top of the ranking so repeat visits see some variety.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::{ActionError, ActionResult, ContentService, StoreResultExt};
use crate::error::Result;
use crate::store::{PostQuery, ProjectQuery, Store};
use crate::types::{Link, LinkTable, Post, Project};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedConfig {
    /// Items returned per list.
    pub limit: usize,
    /// Best-ranked candidates the random pick draws from.
    pub candidate_pool: usize,
}

impl Default for RelatedConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            candidate_pool: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedToPost {
    pub posts: Vec<Post>,
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedToProject {
    pub projects: Vec<Project>,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone)]
pub struct Candidate<T> {
    pub item: T,
    /// Shared tag count.
    pub score: usize,
    pub recency: DateTime<Utc>,
}

fn by_rank<T>(a: &Candidate<T>, b: &Candidate<T>) -> std::cmp::Ordering {
    b.score.cmp(&a.score).then(b.recency.cmp(&a.recency))
}

/// Keeps candidates with a positive score, takes the best
/// `candidate_pool`, draws `limit` of them and returns those best first.
pub fn pick_related<T, R: Rng + ?Sized>(
    mut candidates: Vec<Candidate<T>>,
    config: RelatedConfig,
    rng: &mut R,
) -> Vec<T> {
    candidates.retain(|c| c.score > 0);
    candidates.sort_by(by_rank);
    candidates.truncate(config.candidate_pool.max(config.limit));
    candidates.shuffle(rng);
    candidates.truncate(config.limit);
    candidates.sort_by(by_rank);
    candidates.into_iter().map(|c| c.item).collect()
}

fn post_recency(post: &Post) -> DateTime<Utc> {
    post.published_at.unwrap_or(post.created_at)
}

/// Counts, per owner in `table`, how many of `tag_ids` it carries.
fn shared_tag_counts(
    store: &dyn Store,
    table: LinkTable,
    tag_ids: &[String],
    exclude: Option<&str>,
) -> Result<HashMap<String, usize>> {
    let mut counts = HashMap::new();
    for link in store.list_links_by_targets(table, tag_ids)? {
        if exclude == Some(link.owner_id.as_str()) {
            continue;
        }
        *counts.entry(link.owner_id).or_insert(0) += 1;
    }
    Ok(counts)
}

fn target_ids(links: Vec<Link>) -> Vec<String> {
    links.into_iter().map(|l| l.target_id).collect()
}

/// Reorders `items` to follow `order`, dropping ids with no item.
fn in_link_order<T>(order: &[String], items: Vec<T>, id: impl Fn(&T) -> &str) -> Vec<T> {
    let mut by_id: HashMap<String, T> = items
        .into_iter()
        .map(|item| (id(&item).to_string(), item))
        .collect();
    order.iter().filter_map(|id| by_id.remove(id)).collect()
}

impl ContentService {
    fn visible_posts(&self, ids: Vec<String>) -> Result<Vec<Post>> {
        self.store.list_posts(&PostQuery {
            visible_at: Some(Utc::now()),
            ids: Some(ids),
            ..Default::default()
        })
    }

    fn projects_by_ids(&self, ids: Vec<String>) -> Result<Vec<Project>> {
        self.store.list_projects(&ProjectQuery {
            ids: Some(ids),
            ..Default::default()
        })
    }

    fn ranked_posts(&self, tag_ids: &[String], exclude: Option<&str>) -> Result<Vec<Post>> {
        let counts = shared_tag_counts(self.store.as_ref(), LinkTable::PostTags, tag_ids, exclude)?;
        let posts = self.visible_posts(counts.keys().cloned().collect())?;
        let candidates = posts
            .into_iter()
            .map(|post| Candidate {
                score: counts.get(&post.id).copied().unwrap_or(0),
                recency: post_recency(&post),
                item: post,
            })
            .collect();
        Ok(pick_related(candidates, self.related, &mut rand::thread_rng()))
    }

    fn ranked_projects(&self, tag_ids: &[String], exclude: Option<&str>) -> Result<Vec<Project>> {
        let counts = shared_tag_counts(
            self.store.as_ref(),
            LinkTable::ProjectTags,
            tag_ids,
            exclude,
        )?;
        let projects = self.projects_by_ids(counts.keys().cloned().collect())?;
        let candidates = projects
            .into_iter()
            .map(|project| Candidate {
                score: counts.get(&project.id).copied().unwrap_or(0),
                recency: project.created_at,
                item: project,
            })
            .collect();
        Ok(pick_related(candidates, self.related, &mut rand::thread_rng()))
    }

    fn related_for_post(&self, post: &Post) -> Result<RelatedToPost> {
        let store = self.store.as_ref();
        let tag_ids = target_ids(store.list_links(LinkTable::PostTags, &post.id)?);

        let linked_posts = target_ids(store.list_links(LinkTable::PostLinks, &post.id)?);
        let posts = if linked_posts.is_empty() {
            self.ranked_posts(&tag_ids, Some(&post.id))?
        } else {
            let found = self.visible_posts(linked_posts.clone())?;
            in_link_order(&linked_posts, found, |p| p.id.as_str())
        };

        let linked_projects = target_ids(store.list_links(LinkTable::PostProjectLinks, &post.id)?);
        let projects = if linked_projects.is_empty() {
            self.ranked_projects(&tag_ids, None)?
        } else {
            let found = self.projects_by_ids(linked_projects.clone())?;
            in_link_order(&linked_projects, found, |p| p.id.as_str())
        };

        Ok(RelatedToPost { posts, projects })
    }

    fn related_for_project(&self, project: &Project) -> Result<RelatedToProject> {
        let store = self.store.as_ref();
        let tag_ids = target_ids(store.list_links(LinkTable::ProjectTags, &project.id)?);
        let projects = self.ranked_projects(&tag_ids, Some(&project.id))?;

        let post_ids: Vec<String> = store
            .list_links_by_targets(LinkTable::PostProjectLinks, std::slice::from_ref(&project.id))?
            .into_iter()
            .map(|l| l.owner_id)
            .collect();
        let posts = if post_ids.is_empty() {
            Vec::new()
        } else {
            self.visible_posts(post_ids)?
        };

        Ok(RelatedToProject { projects, posts })
    }

    /// Related content for a publicly visible post.
    pub fn related_to_post(&self, slug: &str) -> ActionResult<RelatedToPost> {
        let post = self
            .store
            .get_post_by_slug(slug)
            .or_fail("Failed to load post")?
            .filter(|p| p.is_visible_at(Utc::now()))
            .ok_or_else(|| ActionError::NotFound("Post not found".to_string()))?;
        self.related_for_post(&post)
            .or_fail("Failed to load related content")
    }

    pub fn related_to_project(&self, slug: &str) -> ActionResult<RelatedToProject> {
        let project = self
            .store
            .get_project_by_slug(slug)
            .or_fail("Failed to load project")?
            .ok_or_else(|| ActionError::NotFound("Project not found".to_string()))?;
        self.related_for_project(&project)
            .or_fail("Failed to load related content")
    }
}
