use std::collections::HashSet;

use url::Url;

use super::ActionError;
use super::in_progress::InProgressInput;
use super::posts::PostInput;
use super::projects::ProjectInput;
use super::tags::TagInput;
use crate::types::PostStatus;

const MAX_TITLE_LEN: usize = 200;
const MAX_SLUG_LEN: usize = 100;
const MAX_EXCERPT_LEN: usize = 500;
const MAX_DESCRIPTION_LEN: usize = 2000;
const MAX_TAG_NAME_LEN: usize = 50;

type FieldResult = Result<(), ActionError>;

fn invalid(field: &str, problem: impl std::fmt::Display) -> ActionError {
    ActionError::Validation(format!("{field}: {problem}"))
}

fn validate_text(field: &str, value: &str, max_len: usize) -> FieldResult {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if value.chars().count() > max_len {
        return Err(invalid(field, format!("cannot exceed {max_len} characters")));
    }
    Ok(())
}

fn validate_optional_text(field: &str, value: Option<&str>, max_len: usize) -> FieldResult {
    match value {
        Some(v) if v.chars().count() > max_len => {
            Err(invalid(field, format!("cannot exceed {max_len} characters")))
        }
        _ => Ok(()),
    }
}

pub fn validate_slug(field: &str, slug: &str) -> FieldResult {
    if slug.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(invalid(field, format!("cannot exceed {MAX_SLUG_LEN} characters")));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            field,
            "can only contain lowercase letters, digits, and hyphens",
        ));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(invalid(field, "cannot start or end with a hyphen"));
    }
    Ok(())
}

fn validate_url(field: &str, value: Option<&str>) -> FieldResult {
    let Some(raw) = value else {
        return Ok(());
    };
    let not_http = || invalid(field, "must be an absolute http(s) URL");
    if raw.contains(char::is_whitespace) {
        return Err(not_http());
    }
    let url = Url::parse(raw).map_err(|e| invalid(field, format!("is not a valid URL ({e})")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(not_http());
    }
    // The parser treats `https:///host` as `https://host`; an empty authority
    // is still a missing host here.
    let authority = raw
        .get(url.scheme().len()..)
        .and_then(|rest| rest.strip_prefix("://"));
    match authority {
        Some(rest) if !rest.starts_with('/') && url.host_str().is_some_and(|h| !h.is_empty()) => {
            Ok(())
        }
        _ => Err(invalid(field, "must include a host")),
    }
}

fn validate_ids(field: &str, ids: Option<&[String]>) -> FieldResult {
    let Some(ids) = ids else {
        return Ok(());
    };
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(invalid(field, "ids must not be empty"));
        }
        if !seen.insert(id.as_str()) {
            return Err(invalid(field, format!("duplicate id '{id}'")));
        }
    }
    Ok(())
}

pub fn validate_color(color: Option<&str>) -> FieldResult {
    let Some(color) = color else {
        return Ok(());
    };
    let hex = color.strip_prefix('#').unwrap_or("");
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("color", "must be a hex color like #1e90ff"));
    }
    Ok(())
}

pub fn validate_post(input: &PostInput) -> FieldResult {
    validate_text("title", &input.title, MAX_TITLE_LEN)?;
    validate_slug("slug", &input.slug)?;
    validate_optional_text("excerpt", input.excerpt.as_deref(), MAX_EXCERPT_LEN)?;
    validate_url("cover_image_url", input.cover_image_url.as_deref())?;
    validate_url("ogp_image_url", input.ogp_image_url.as_deref())?;
    if input.status == PostStatus::Scheduled && input.published_at.is_none() {
        return Err(invalid("published_at", "is required for scheduled posts"));
    }
    validate_ids("tag_ids", input.tag_ids.as_deref())?;
    validate_ids("related_post_ids", input.related_post_ids.as_deref())?;
    validate_ids("related_project_ids", input.related_project_ids.as_deref())?;
    Ok(())
}

pub fn validate_project(input: &ProjectInput) -> FieldResult {
    validate_text("title", &input.title, MAX_TITLE_LEN)?;
    validate_slug("slug", &input.slug)?;
    validate_optional_text(
        "description",
        input.description.as_deref(),
        MAX_DESCRIPTION_LEN,
    )?;
    validate_url("demo_url", input.demo_url.as_deref())?;
    validate_url("github_url", input.github_url.as_deref())?;
    validate_url("cover_image_url", input.cover_image_url.as_deref())?;
    for url in &input.gallery_images {
        validate_url("gallery_images", Some(url))?;
    }
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if end < start {
            return Err(invalid("end_date", "must not be before start_date"));
        }
    }
    if input.steps_count.is_some_and(|n| n < 0) {
        return Err(invalid("steps_count", "must not be negative"));
    }
    let mut total = 0.0;
    for (language, share) in &input.tech_stack {
        if language.trim().is_empty() {
            return Err(invalid("tech_stack", "language names must not be empty"));
        }
        if !(0.0..=100.0).contains(share) {
            return Err(invalid(
                "tech_stack",
                format!("{language} must be between 0 and 100"),
            ));
        }
        total += share;
    }
    if total > 100.0 {
        return Err(invalid("tech_stack", "percentages cannot add up to more than 100"));
    }
    validate_ids("tag_ids", input.tag_ids.as_deref())?;
    Ok(())
}

pub fn validate_tag(input: &TagInput) -> FieldResult {
    validate_text("name", &input.name, MAX_TAG_NAME_LEN)?;
    validate_slug("slug", &input.slug)?;
    validate_optional_text(
        "description",
        input.description.as_deref(),
        MAX_DESCRIPTION_LEN,
    )?;
    validate_color(input.color.as_deref())
}

pub fn validate_in_progress(input: &InProgressInput) -> FieldResult {
    validate_text("title", &input.title, MAX_TITLE_LEN)?;
    validate_optional_text(
        "description",
        input.description.as_deref(),
        MAX_DESCRIPTION_LEN,
    )?;
    if !(0..=100).contains(&input.progress_rate) {
        return Err(invalid("progress_rate", "must be between 0 and 100"));
    }
    if let (Some(started), Some(completed)) = (input.started_at, input.completed_at) {
        if completed < started {
            return Err(invalid("completed_at", "must not be before started_at"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: FieldResult) -> String {
        match result {
            Err(ActionError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("slug", "hello-world-2").is_ok());
        assert_eq!(
            message(validate_slug("slug", "Hello")),
            "slug: can only contain lowercase letters, digits, and hyphens"
        );
        assert!(validate_slug("slug", "-leading").is_err());
        assert!(validate_slug("slug", "").is_err());
        assert!(validate_slug("slug", &"a".repeat(101)).is_err());
    }

    #[test]
    fn test_color_rules() {
        assert!(validate_color(None).is_ok());
        assert!(validate_color(Some("#A0b1C2")).is_ok());
        assert!(validate_color(Some("a0b1c2")).is_err());
        assert!(validate_color(Some("#a0b1c")).is_err());
    }

    #[test]
    fn test_scheduled_post_needs_date() {
        let input: PostInput = serde_json::from_value(serde_json::json!({
            "title": "Soon",
            "slug": "soon",
            "status": "scheduled"
        }))
        .unwrap();
        assert_eq!(
            message(validate_post(&input)),
            "published_at: is required for scheduled posts"
        );
    }

    #[test]
    fn test_tech_stack_total() {
        let input: ProjectInput = serde_json::from_value(serde_json::json!({
            "title": "Site",
            "slug": "site",
            "tech_stack": {"Rust": 70.0, "TypeScript": 40.0}
        }))
        .unwrap();
        assert_eq!(
            message(validate_project(&input)),
            "tech_stack: percentages cannot add up to more than 100"
        );
    }

    #[test]
    fn test_url_rules() {
        assert!(validate_url("demo_url", None).is_ok());
        assert!(validate_url("demo_url", Some("https://example.com/demo?x=1")).is_ok());
        assert!(validate_url("demo_url", Some("http://localhost:8080")).is_ok());

        assert_eq!(
            message(validate_url("demo_url", Some("https:///no-host"))),
            "demo_url: must include a host"
        );
        assert_eq!(
            message(validate_url("demo_url", Some("ftp://example.com/file"))),
            "demo_url: must be an absolute http(s) URL"
        );
        for malformed in [
            "http://%%%",
            "https://exa<mple>.com",
            "http://:99999",
            "example.com/no-scheme",
            "https://exa mple.com",
            "",
        ] {
            assert!(
                validate_url("demo_url", Some(malformed)).is_err(),
                "{malformed:?} was accepted"
            );
        }
    }

    #[test]
    fn test_tech_stack_total_exactly_100_is_allowed() {
        let mut input: ProjectInput = serde_json::from_value(serde_json::json!({
            "title": "Site",
            "slug": "site",
            "tech_stack": {"Rust": 60.0, "TypeScript": 40.0}
        }))
        .unwrap();
        assert!(validate_project(&input).is_ok());

        input.tech_stack.insert("CSS".to_string(), 0.25);
        assert_eq!(
            message(validate_project(&input)),
            "tech_stack: percentages cannot add up to more than 100"
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let input: PostInput = serde_json::from_value(serde_json::json!({
            "title": "Dup",
            "slug": "dup",
            "tag_ids": ["a", "a"]
        }))
        .unwrap();
        assert_eq!(message(validate_post(&input)), "tag_ids: duplicate id 'a'");
    }

    #[test]
    fn test_progress_rate_bounds() {
        let input: InProgressInput = serde_json::from_value(serde_json::json!({
            "title": "Thing",
            "progress_rate": 101
        }))
        .unwrap();
        assert_eq!(
            message(validate_in_progress(&input)),
            "progress_rate: must be between 0 and 100"
        );
    }
}
