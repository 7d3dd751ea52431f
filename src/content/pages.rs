use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{ActionError, ActionResult, ContentService, StoreResultExt};
use crate::types::{Page, PageType};

/// Body of a page save. `metadata` holds the structured page data (hero
/// text, social links, skills...) and must be a JSON object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInput {
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub metadata: Value,
}

fn object_or_empty(field: &str, value: Value) -> ActionResult<Value> {
    match value {
        Value::Null => Ok(Value::Object(Default::default())),
        Value::Object(_) => Ok(value),
        _ => Err(ActionError::Validation(format!(
            "{field}: must be a JSON object"
        ))),
    }
}

impl ContentService {
    pub fn get_page(&self, page_type: PageType) -> ActionResult<Page> {
        self.store
            .get_page(page_type)
            .or_fail("Failed to load page")?
            .ok_or_else(|| ActionError::NotFound("Page not found".to_string()))
    }

    /// Creates or replaces the singleton page of `page_type`.
    pub fn save_page(&self, page_type: PageType, input: PageInput) -> ActionResult<Page> {
        let metadata = object_or_empty("metadata", input.metadata)?;
        let content = match input.content {
            Value::Null => Value::Object(Default::default()),
            content => content,
        };

        let existing = self
            .store
            .get_page(page_type)
            .or_fail("Failed to load page")?;
        let now = Utc::now();
        let page = match existing {
            Some(existing) => Page {
                content,
                metadata,
                updated_at: now,
                ..existing
            },
            None => Page {
                id: Uuid::new_v4().to_string(),
                page_type,
                content,
                metadata,
                created_at: now,
                updated_at: now,
            },
        };

        self.store.upsert_page(&page).or_fail("Failed to save page")?;
        tracing::info!(page_type = %page_type, "page saved");
        self.revalidate(&[page_type.route().to_string()]);
        Ok(page)
    }
}
