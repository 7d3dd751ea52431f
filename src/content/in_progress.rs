use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::validation::validate_in_progress;
use super::{ActionError, ActionResult, ContentService, StoreResultExt};
use crate::error::Error;
use crate::types::{InProgress, ProgressStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct InProgressInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProgressStatus,
    #[serde(default)]
    pub progress_rate: i32,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_project_id: Option<String>,
}

fn not_found() -> ActionError {
    ActionError::NotFound("In-progress item not found".to_string())
}

fn progress_paths() -> Vec<String> {
    vec!["/".to_string(), "/progress".to_string()]
}

impl ContentService {
    fn check_project_exists(&self, project_id: Option<&str>) -> ActionResult<()> {
        let Some(project_id) = project_id else {
            return Ok(());
        };
        match self
            .store
            .get_project(project_id)
            .or_fail("Failed to load project")?
        {
            Some(_) => Ok(()),
            None => Err(ActionError::Validation(
                "completed_project_id: project does not exist".to_string(),
            )),
        }
    }

    fn apply_in_progress(
        &self,
        input: InProgressInput,
        id: String,
        created_at: DateTime<Utc>,
    ) -> ActionResult<InProgress> {
        validate_in_progress(&input)?;
        self.check_project_exists(input.completed_project_id.as_deref())?;

        let now = Utc::now();
        let completed_at = match input.status {
            ProgressStatus::Completed => input.completed_at.or(Some(now)),
            _ => input.completed_at,
        };
        Ok(InProgress {
            id,
            title: input.title.trim().to_string(),
            description: input.description,
            status: input.status,
            progress_rate: input.progress_rate,
            started_at: input.started_at,
            completed_at,
            completed_project_id: input.completed_project_id,
            created_at,
            updated_at: now,
        })
    }

    pub fn create_in_progress(&self, input: InProgressInput) -> ActionResult<InProgress> {
        let item = self.apply_in_progress(input, Uuid::new_v4().to_string(), Utc::now())?;
        self.store
            .insert_in_progress(&item)
            .or_fail("Failed to create in-progress item")?;

        tracing::info!(item_id = %item.id, "in-progress item created");
        self.revalidate(&progress_paths());
        Ok(item)
    }

    pub fn update_in_progress(&self, id: &str, input: InProgressInput) -> ActionResult<InProgress> {
        let existing = self
            .store
            .get_in_progress(id)
            .or_fail("Failed to load in-progress item")?
            .ok_or_else(not_found)?;

        let item = self.apply_in_progress(input, existing.id, existing.created_at)?;
        self.store.update_in_progress(&item).map_err(|e| match e {
            Error::NotFound => not_found(),
            e => {
                tracing::error!(error = %e, "Failed to update in-progress item");
                ActionError::Failed("Failed to update in-progress item".to_string())
            }
        })?;

        tracing::info!(item_id = %id, "in-progress item updated");
        self.revalidate(&progress_paths());
        Ok(item)
    }

    pub fn delete_in_progress(&self, id: &str) -> ActionResult<()> {
        if !self
            .store
            .delete_in_progress(id)
            .or_fail("Failed to delete in-progress item")?
        {
            return Err(not_found());
        }
        tracing::info!(item_id = %id, "in-progress item deleted");
        self.revalidate(&progress_paths());
        Ok(())
    }

    pub fn list_in_progress(&self) -> ActionResult<Vec<InProgress>> {
        self.store
            .list_in_progress()
            .or_fail("Failed to list in-progress items")
    }

    /// Marks an item finished, optionally pointing at the project it became.
    pub fn complete_in_progress(
        &self,
        id: &str,
        project_id: Option<String>,
    ) -> ActionResult<InProgress> {
        let existing = self
            .store
            .get_in_progress(id)
            .or_fail("Failed to load in-progress item")?
            .ok_or_else(not_found)?;
        self.check_project_exists(project_id.as_deref())?;

        let now = Utc::now();
        let item = InProgress {
            status: ProgressStatus::Completed,
            progress_rate: 100,
            completed_at: Some(now),
            completed_project_id: project_id.or(existing.completed_project_id.clone()),
            updated_at: now,
            ..existing
        };
        self.store
            .update_in_progress(&item)
            .or_fail("Failed to complete in-progress item")?;

        tracing::info!(item_id = %id, "in-progress item completed");
        let mut paths = progress_paths();
        if let Some(project_id) = &item.completed_project_id {
            match self.store.get_project(project_id) {
                Ok(Some(project)) => paths.push(format!("/projects/{}", project.slug)),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    project_id = %project_id,
                    error = %e,
                    "failed to load completed project for revalidation"
                ),
            }
        }
        self.revalidate(&paths);
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::content::testing::{FaultyStore, seed_project};
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

    fn input(value: serde_json::Value) -> InProgressInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_defaults() {
        let (_store, service) = service();
        let item = service
            .create_in_progress(input(json!({"title": "Rewrite"})))
            .unwrap();
        assert_eq!(item.status, ProgressStatus::NotStarted);
        assert_eq!(item.progress_rate, 0);
        assert!(item.completed_at.is_none());
    }

    #[test]
    fn test_completed_status_stamps_date() {
        let (_store, service) = service();
        let item = service
            .create_in_progress(input(json!({"title": "Done", "status": "completed", "progress_rate": 100})))
            .unwrap();
        assert!(item.completed_at.is_some());
    }

    #[test]
    fn test_complete_links_project() {
        let (store, service) = service();
        seed_project(store.as_ref(), "pr1", "shipped");
        let item = service
            .create_in_progress(input(json!({"title": "Ship it", "status": "in_progress", "progress_rate": 40})))
            .unwrap();

        let done = service
            .complete_in_progress(&item.id, Some("pr1".to_string()))
            .unwrap();
        assert_eq!(done.status, ProgressStatus::Completed);
        assert_eq!(done.progress_rate, 100);
        assert_eq!(done.completed_project_id.as_deref(), Some("pr1"));
        assert_eq!(done.created_at, item.created_at);

        // Deleting the project leaves the item with no reference.
        store.delete_project("pr1").unwrap();
        let reloaded = store.get_in_progress(&item.id).unwrap().unwrap();
        assert!(reloaded.completed_project_id.is_none());
    }

    #[test]
    fn test_complete_survives_project_lookup_failure_for_revalidation() {
        let store = Arc::new(FaultyStore::new());
        let revalidator = Arc::new(RecordingRevalidator::default());
        let service = ContentService::new(
            store.clone(),
            revalidator.clone(),
            RelatedConfig::default(),
        );
        seed_project(store.as_ref(), "pr1", "shipped");
        let item = service
            .create_in_progress(input(json!({"title": "Ship it"})))
            .unwrap();
        service
            .complete_in_progress(&item.id, Some("pr1".to_string()))
            .unwrap();

        store.fail("get_project");
        let again = service.complete_in_progress(&item.id, None).unwrap();
        assert_eq!(again.completed_project_id.as_deref(), Some("pr1"));

        let project_hints = revalidator
            .paths()
            .iter()
            .filter(|p| *p == "/projects/shipped")
            .count();
        assert_eq!(project_hints, 1);
        assert!(revalidator.paths().ends_with(&["/".to_string(), "/progress".to_string()]));
    }

    #[test]
    fn test_complete_rejects_unknown_project() {
        let (_store, service) = service();
        let item = service
            .create_in_progress(input(json!({"title": "Ghost"})))
            .unwrap();
        assert!(matches!(
            service.complete_in_progress(&item.id, Some("nope".to_string())),
            Err(ActionError::Validation(_))
        ));
        assert!(matches!(
            service.complete_in_progress("missing", None),
            Err(ActionError::NotFound(_))
        ));
    }
}
