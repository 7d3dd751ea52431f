use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::validation::validate_tag;
use super::{ActionError, ActionResult, ContentService, StoreResultExt};
use crate::error::Error;
use crate::types::{LinkTable, Tag, TagWithCounts};

const DUPLICATE_TAG: &str = "A tag with this name or slug already exists";

#[derive(Debug, Clone, Deserialize)]
pub struct TagInput {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

fn tag_write_failed(err: Error, generic: &'static str) -> ActionError {
    match err {
        Error::AlreadyExists => ActionError::Duplicate(DUPLICATE_TAG.to_string()),
        Error::NotFound => ActionError::NotFound("Tag not found".to_string()),
        e => {
            tracing::error!(error = %e, "{generic}");
            ActionError::Failed(generic.to_string())
        }
    }
}

// Tags appear on every listing.
fn tag_paths() -> Vec<String> {
    ["/", "/posts", "/projects", "/tags"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl ContentService {
    pub fn create_tag(&self, input: TagInput) -> ActionResult<Tag> {
        validate_tag(&input)?;

        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            slug: input.slug,
            description: input.description,
            color: input.color,
            created_at: Utc::now(),
        };
        self.store
            .insert_tag(&tag)
            .map_err(|e| tag_write_failed(e, "Failed to create tag"))?;

        tracing::info!(tag_id = %tag.id, slug = %tag.slug, "tag created");
        self.revalidate(&tag_paths());
        Ok(tag)
    }

    pub fn update_tag(&self, id: &str, input: TagInput) -> ActionResult<Tag> {
        validate_tag(&input)?;

        let existing = self
            .store
            .get_tag(id)
            .or_fail("Failed to load tag")?
            .ok_or_else(|| ActionError::NotFound("Tag not found".to_string()))?;

        let tag = Tag {
            name: input.name.trim().to_string(),
            slug: input.slug,
            description: input.description,
            color: input.color,
            ..existing
        };
        self.store
            .update_tag(&tag)
            .map_err(|e| tag_write_failed(e, "Failed to update tag"))?;

        tracing::info!(tag_id = %id, "tag updated");
        self.revalidate(&tag_paths());
        Ok(tag)
    }

    /// Deletes a tag. Its link rows go with it.
    pub fn delete_tag(&self, id: &str) -> ActionResult<()> {
        if !self.store.delete_tag(id).or_fail("Failed to delete tag")? {
            return Err(ActionError::NotFound("Tag not found".to_string()));
        }
        tracing::info!(tag_id = %id, "tag deleted");
        self.revalidate(&tag_paths());
        Ok(())
    }

    pub fn list_tags(&self) -> ActionResult<Vec<Tag>> {
        self.store.list_tags().or_fail("Failed to list tags")
    }

    pub fn list_tags_with_counts(&self) -> ActionResult<Vec<TagWithCounts>> {
        let store = self.store.as_ref();
        let tags = store.list_tags().or_fail("Failed to list tags")?;
        let post_counts = store
            .count_links_by_target(LinkTable::PostTags)
            .or_fail("Failed to count tag usage")?;
        let project_counts = store
            .count_links_by_target(LinkTable::ProjectTags)
            .or_fail("Failed to count tag usage")?;

        Ok(tags
            .into_iter()
            .map(|tag| TagWithCounts {
                post_count: post_counts.get(&tag.id).copied().unwrap_or(0),
                project_count: project_counts.get(&tag.id).copied().unwrap_or(0),
                tag,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::content::testing::{FaultyStore, seed_post, seed_project};
    use crate::content::{RecordingRevalidator, RelatedConfig};
    use crate::store::Store;
    use crate::types::{Link, PostStatus};

    fn service() -> (Arc<FaultyStore>, ContentService) {
        let store = Arc::new(FaultyStore::new());
        let service = ContentService::new(
            store.clone(),
            Arc::new(RecordingRevalidator::default()),
            RelatedConfig::default(),
        );
        (store, service)
    }

    fn input(name: &str, slug: &str) -> TagInput {
        serde_json::from_value(json!({"name": name, "slug": slug, "color": "#ff8800"})).unwrap()
    }

    #[test]
    fn test_duplicate_name_or_slug() {
        let (_store, service) = service();
        service.create_tag(input("Rust", "rust")).unwrap();

        for dup in [input("Rust", "rust-lang"), input("Rustacean", "rust")] {
            assert!(matches!(
                service.create_tag(dup),
                Err(ActionError::Duplicate(ref m)) if m == DUPLICATE_TAG
            ));
        }
    }

    #[test]
    fn test_update_keeps_id_and_created_at() {
        let (_store, service) = service();
        let tag = service.create_tag(input("Web", "web")).unwrap();
        let updated = service.update_tag(&tag.id, input("Web Dev", "web-dev")).unwrap();
        assert_eq!(updated.id, tag.id);
        assert_eq!(updated.created_at, tag.created_at);
        assert_eq!(updated.slug, "web-dev");

        assert!(matches!(
            service.update_tag("missing", input("X", "x")),
            Err(ActionError::NotFound(_))
        ));
    }

    #[test]
    fn test_counts_and_cascade() {
        let (store, service) = service();
        let tag = service.create_tag(input("Rust", "rust")).unwrap();
        seed_post(store.as_ref(), "p1", "one", PostStatus::Draft);
        seed_post(store.as_ref(), "p2", "two", PostStatus::Published);
        seed_project(store.as_ref(), "pr1", "proj");
        store
            .insert_links(
                LinkTable::PostTags,
                &[Link::new("p1", &tag.id), Link::new("p2", &tag.id)],
            )
            .unwrap();
        store
            .insert_links(LinkTable::ProjectTags, &[Link::new("pr1", &tag.id)])
            .unwrap();

        let counted = service.list_tags_with_counts().unwrap();
        assert_eq!(counted.len(), 1);
        assert_eq!(counted[0].post_count, 2);
        assert_eq!(counted[0].project_count, 1);

        service.delete_tag(&tag.id).unwrap();
        assert!(store.list_links(LinkTable::PostTags, "p1").unwrap().is_empty());
        assert!(matches!(
            service.delete_tag(&tag.id),
            Err(ActionError::NotFound(_))
        ));
    }
}
