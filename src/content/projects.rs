use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::filter::{TagMatch, owners_with_all_tags};
use super::posts::replace_links;
use super::saga::Saga;
use super::validation::validate_project;
use super::{
    ActionError, ActionResult, ContentService, StoreResultExt, dedup_ids, linked_tags,
    parent_write_failed, rolled_back,
};
use crate::store::ProjectQuery;
use crate::types::{Link, LinkTable, Project, ProjectStatus, ProjectWithTags};

const DUPLICATE_SLUG: &str = "A project with this slug already exists";

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInput {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub gallery_images: Vec<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub steps_count: Option<i32>,
    #[serde(default)]
    pub used_ai: Vec<String>,
    #[serde(default)]
    pub tech_stack: BTreeMap<String, f64>,
    #[serde(default)]
    pub tag_ids: Option<Vec<String>>,
}

impl ProjectInput {
    fn into_project(self, id: String, created_at: chrono::DateTime<Utc>) -> Project {
        Project {
            id,
            title: self.title.trim().to_string(),
            slug: self.slug,
            description: self.description,
            content: if self.content.is_null() {
                serde_json::json!({})
            } else {
                self.content
            },
            demo_url: self.demo_url,
            github_url: self.github_url,
            cover_image_url: self.cover_image_url,
            gallery_images: self.gallery_images,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            steps_count: self.steps_count,
            used_ai: self.used_ai,
            tech_stack: self.tech_stack,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

fn project_tag_links(project_id: &str, tag_ids: Option<&[String]>) -> Option<Vec<Link>> {
    tag_ids.map(|ids| {
        dedup_ids(ids)
            .into_iter()
            .map(|tag| Link::new(project_id, tag))
            .collect()
    })
}

fn project_paths(slug: &str) -> Vec<String> {
    vec![
        "/".to_string(),
        "/projects".to_string(),
        format!("/projects/{slug}"),
    ]
}

impl ContentService {
    pub fn create_project(&self, input: ProjectInput) -> ActionResult<ProjectWithTags> {
        validate_project(&input)?;

        let id = Uuid::new_v4().to_string();
        let links = project_tag_links(&id, input.tag_ids.as_deref());
        let project = input.into_project(id, Utc::now());
        let store = self.store.as_ref();

        let mut saga = Saga::new("create_project");
        saga.step(
            "insert project",
            || store.insert_project(&project),
            || store.delete_project(&project.id).map(|_| ()),
        )
        .map_err(|e| parent_write_failed(e, DUPLICATE_SLUG, "Failed to create project"))?;

        if let Some(links) = &links {
            saga.step(
                "insert project_tags",
                || store.insert_links(LinkTable::ProjectTags, links),
                || {
                    store
                        .delete_links(LinkTable::ProjectTags, &project.id)
                        .map(|_| ())
                },
            )
            .map_err(|e| rolled_back(e, "Failed to save the project's tags."))?;
        }
        saga.commit();

        tracing::info!(project_id = %project.id, slug = %project.slug, "project created");
        self.revalidate(&project_paths(&project.slug));
        self.project_with_tags(project)
    }

    pub fn update_project(&self, id: &str, input: ProjectInput) -> ActionResult<ProjectWithTags> {
        validate_project(&input)?;

        let store = self.store.as_ref();
        let previous = store
            .get_project(id)
            .or_fail("Failed to load project")?
            .ok_or_else(|| ActionError::NotFound("Project not found".to_string()))?;

        let links = project_tag_links(id, input.tag_ids.as_deref());
        let updated = input.into_project(previous.id.clone(), previous.created_at);

        let mut saga = Saga::new("update_project");
        saga.step(
            "update project",
            || store.update_project(&updated),
            || store.update_project(&previous),
        )
        .map_err(|e| parent_write_failed(e, DUPLICATE_SLUG, "Failed to update project"))?;

        if let Some(links) = &links {
            replace_links(&mut saga, store, LinkTable::ProjectTags, id, links)
                .map_err(|e| rolled_back(e, "Failed to update the project's tags."))?;
        }
        saga.commit();

        tracing::info!(project_id = %id, slug = %updated.slug, "project updated");
        let mut paths = project_paths(&updated.slug);
        if previous.slug != updated.slug {
            paths.push(format!("/projects/{}", previous.slug));
        }
        self.revalidate(&paths);
        self.project_with_tags(updated)
    }

    pub fn delete_project(&self, id: &str) -> ActionResult<()> {
        let store = self.store.as_ref();
        let project = store
            .get_project(id)
            .or_fail("Failed to load project")?
            .ok_or_else(|| ActionError::NotFound("Project not found".to_string()))?;

        if !store.delete_project(id).or_fail("Failed to delete project")? {
            return Err(ActionError::NotFound("Project not found".to_string()));
        }

        tracing::info!(project_id = %id, "project deleted");
        let mut paths = project_paths(&project.slug);
        paths.push("/progress".to_string());
        self.revalidate(&paths);
        Ok(())
    }

    pub fn get_project(&self, id: &str) -> ActionResult<ProjectWithTags> {
        let project = self
            .store
            .get_project(id)
            .or_fail("Failed to load project")?
            .ok_or_else(|| ActionError::NotFound("Project not found".to_string()))?;
        self.project_with_tags(project)
    }

    pub fn get_project_by_slug(&self, slug: &str) -> ActionResult<ProjectWithTags> {
        let project = self
            .store
            .get_project_by_slug(slug)
            .or_fail("Failed to load project")?
            .ok_or_else(|| ActionError::NotFound("Project not found".to_string()))?;
        self.project_with_tags(project)
    }

    /// Projects carrying every tag in `tag_slugs`, optionally narrowed to
    /// one status. Projects have no draft state, so admin and public
    /// listings share this.
    pub fn list_projects(
        &self,
        tag_slugs: &[String],
        status: Option<ProjectStatus>,
    ) -> ActionResult<Vec<ProjectWithTags>> {
        let store = self.store.as_ref();
        let ids = match owners_with_all_tags(store, LinkTable::ProjectTags, tag_slugs)
            .or_fail("Failed to filter projects by tag")?
        {
            TagMatch::Owners(ids) if ids.is_empty() => return Ok(Vec::new()),
            matched => matched.into_ids(),
        };

        let projects = store
            .list_projects(&ProjectQuery {
                status,
                ids,
                ..Default::default()
            })
            .or_fail("Failed to list projects")?;

        let all_tags = store.list_tags().or_fail("Failed to load tags")?;

        projects
            .into_iter()
            .map(|project| {
                let links = store
                    .list_links(LinkTable::ProjectTags, &project.id)
                    .or_fail("Failed to load project tags")?;
                let tags = linked_tags(&all_tags, &links);
                Ok(ProjectWithTags { project, tags })
            })
            .collect()
    }

    pub(crate) fn project_with_tags(&self, project: Project) -> ActionResult<ProjectWithTags> {
        let store = self.store.as_ref();
        let tag_ids: Vec<String> = store
            .list_links(LinkTable::ProjectTags, &project.id)
            .or_fail("Failed to load project tags")?
            .into_iter()
            .map(|l| l.target_id)
            .collect();
        let tags = store
            .list_tags_by_ids(&tag_ids)
            .or_fail("Failed to load project tags")?;
        Ok(ProjectWithTags { project, tags })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::content::testing::{FaultyStore, seed_tag};
    use crate::content::{RecordingRevalidator, RelatedConfig};
    use crate::store::Store;

    fn service() -> (Arc<FaultyStore>, ContentService) {
        let store = Arc::new(FaultyStore::new());
        let service = ContentService::new(
            store.clone(),
            Arc::new(RecordingRevalidator::default()),
            RelatedConfig::default(),
        );
        (store, service)
    }

    fn input(slug: &str, tags: &[&str]) -> ProjectInput {
        serde_json::from_value(json!({
            "title": format!("Project {slug}"),
            "slug": slug,
            "status": "completed",
            "tech_stack": {"Rust": 80.0, "SQL": 20.0},
            "tag_ids": tags,
        }))
        .unwrap()
    }

    fn tag_ids(view: &ProjectWithTags) -> Vec<&str> {
        let mut ids: Vec<&str> = view.tags.iter().map(|t| t.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_create_and_filter_by_tags() {
        let (store, service) = service();
        seed_tag(store.as_ref(), "t1", "rust");
        seed_tag(store.as_ref(), "t2", "cli");

        service.create_project(input("both", &["t1", "t2"])).unwrap();
        service.create_project(input("one", &["t1"])).unwrap();

        let found = service
            .list_projects(&["rust".to_string(), "cli".to_string()], None)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].project.slug, "both");
        assert_eq!(tag_ids(&found[0]), vec!["t1", "t2"]);

        let archived = service
            .list_projects(&[], Some(ProjectStatus::Archived))
            .unwrap();
        assert!(archived.is_empty());
    }

    #[test]
    fn test_create_rolls_back_on_unknown_tag() {
        let (store, service) = service();

        let err = service
            .create_project(input("orphan", &["missing"]))
            .unwrap_err();
        assert!(matches!(err, ActionError::RolledBack(_)));
        assert!(store.get_project_by_slug("orphan").unwrap().is_none());
    }

    #[test]
    fn test_update_restores_on_tag_failure() {
        let (store, service) = service();
        seed_tag(store.as_ref(), "t1", "rust");
        seed_tag(store.as_ref(), "t2", "cli");
        let created = service.create_project(input("site", &["t1"])).unwrap();

        store.fail("insert_links:project_tags");
        let mut change = input("site-v2", &["t2"]);
        change.status = ProjectStatus::Archived;
        assert!(matches!(
            service.update_project(&created.project.id, change),
            Err(ActionError::RolledBack(_))
        ));

        let after = service.get_project(&created.project.id).unwrap();
        assert_eq!(after.project.slug, "site");
        assert_eq!(after.project.status, ProjectStatus::Completed);
        assert_eq!(tag_ids(&after), vec!["t1"]);
    }

    #[test]
    fn test_duplicate_slug() {
        let (_store, service) = service();
        service.create_project(input("same", &[])).unwrap();
        assert!(matches!(
            service.create_project(input("same", &[])),
            Err(ActionError::Duplicate(ref m)) if m == DUPLICATE_SLUG
        ));
    }

    #[test]
    fn test_delete_missing_project() {
        let (_store, service) = service();
        assert!(matches!(
            service.delete_project("nope"),
            Err(ActionError::NotFound(_))
        ));
    }
}
