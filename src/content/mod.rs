//! Content actions: the typed operations behind the public site and the
//! admin panel.
//!
//! Multi-table writes (a parent row plus its link rows) go through
//! [`saga::Saga`] so that a failure part-way leaves the previous state
//! behind. Every action returns an [`ActionError`] whose message is safe to
//! show to the author.

pub mod backup;
pub mod filter;
mod in_progress;
mod pages;
mod posts;
mod projects;
pub mod related;
pub mod revalidate;
pub mod saga;
mod tags;
#[cfg(test)]
pub(crate) mod testing;
pub mod validation;

use std::sync::Arc;

use thiserror::Error;

pub use in_progress::InProgressInput;
pub use pages::PageInput;
pub use posts::PostInput;
pub use projects::ProjectInput;
pub use related::{RelatedConfig, RelatedToPost, RelatedToProject};
pub use revalidate::{LogRevalidator, RecordingRevalidator, Revalidate};
pub use tags::TagInput;

use crate::error::{Error, Result as StoreResult};
use crate::store::Store;
use crate::types::{Link, Tag};
use saga::StepFailed;

#[derive(Debug, Error)]
pub enum ActionError {
    /// Input rejected before anything was written.
    #[error("{0}")]
    Validation(String),

    /// A unique key (slug, name) is already taken.
    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    /// A later step failed and earlier writes were undone.
    #[error("{0}")]
    RolledBack(String),

    #[error("{0}")]
    Failed(String),
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;

/// Extension trait for converting store results into action errors.
/// The underlying error is logged; the author only sees `message`.
pub(crate) trait StoreResultExt<T> {
    fn or_fail(self, message: &'static str) -> ActionResult<T>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn or_fail(self, message: &'static str) -> ActionResult<T> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{message}");
            ActionError::Failed(message.to_string())
        })
    }
}

/// Maps the failure of a saga's first (parent row) step.
fn parent_write_failed(err: StepFailed, duplicate: &str, generic: &'static str) -> ActionError {
    match err.source {
        Error::AlreadyExists => ActionError::Duplicate(duplicate.to_string()),
        Error::NotFound => ActionError::NotFound("Record no longer exists".to_string()),
        e => {
            tracing::error!(error = %e, step = %err.step, "{generic}");
            ActionError::Failed(generic.to_string())
        }
    }
}

/// Maps the failure of a later step after the saga unwound.
fn rolled_back(err: StepFailed, message: &str) -> ActionError {
    tracing::error!(error = %err.source, step = %err.step, "{message}");
    if err.fully_reverted() {
        ActionError::RolledBack(format!("{message} Changes have been reverted."))
    } else {
        ActionError::RolledBack(format!(
            "{message} Changes were only partially reverted; please check the record."
        ))
    }
}

/// Entry point for all content actions.
pub struct ContentService {
    store: Arc<dyn Store>,
    revalidator: Arc<dyn Revalidate>,
    related: RelatedConfig,
}

impl ContentService {
    pub fn new(
        store: Arc<dyn Store>,
        revalidator: Arc<dyn Revalidate>,
        related: RelatedConfig,
    ) -> Self {
        Self {
            store,
            revalidator,
            related,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    fn revalidate(&self, paths: &[String]) {
        for path in paths {
            self.revalidator.revalidate(path);
        }
    }
}

/// Removes duplicates while keeping first-seen order.
fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Tags of one owner, in the name order of `all_tags`.
fn linked_tags(all_tags: &[Tag], links: &[Link]) -> Vec<Tag> {
    let linked: std::collections::HashSet<&str> =
        links.iter().map(|l| l.target_id.as_str()).collect();
    all_tags
        .iter()
        .filter(|t| linked.contains(t.id.as_str()))
        .cloned()
        .collect()
}
