//! Tag-intersection filtering: owners that carry *every* requested tag.

use std::collections::HashMap;

use super::dedup_ids;
use crate::error::Result;
use crate::store::Store;
use crate::types::LinkTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMatch {
    /// No tags were requested.
    Unfiltered,
    /// Owner ids carrying all requested tags, in first-linked order.
    Owners(Vec<String>),
}

impl TagMatch {
    /// Id restriction for a list query; `None` means no restriction.
    #[must_use]
    pub fn into_ids(self) -> Option<Vec<String>> {
        match self {
            TagMatch::Unfiltered => None,
            TagMatch::Owners(ids) => Some(ids),
        }
    }
}

/// Parses a comma separated `?tags=` value.
#[must_use]
pub fn parse_tag_param(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

pub fn owners_with_all_tags(
    store: &dyn Store,
    table: LinkTable,
    tag_slugs: &[String],
) -> Result<TagMatch> {
    let slugs = dedup_ids(tag_slugs);
    if slugs.is_empty() {
        return Ok(TagMatch::Unfiltered);
    }

    let tags = store.list_tags_by_slugs(&slugs)?;
    if tags.len() < slugs.len() {
        // An unknown tag can never be matched.
        return Ok(TagMatch::Owners(Vec::new()));
    }

    let tag_ids: Vec<String> = tags.into_iter().map(|t| t.id).collect();
    let links = store.list_links_by_targets(table, &tag_ids)?;

    let mut order = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for link in links {
        let count = counts.entry(link.owner_id.clone()).or_insert(0);
        if *count == 0 {
            order.push(link.owner_id);
        }
        *count += 1;
    }

    let owners = order
        .into_iter()
        .filter(|id| counts.get(id) == Some(&tag_ids.len()))
        .collect();
    Ok(TagMatch::Owners(owners))
}
