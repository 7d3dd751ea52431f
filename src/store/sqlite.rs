use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::de::DeserializeOwned;

use super::schema::SCHEMA;
use super::{PostQuery, ProjectQuery, Store};
use crate::error::{Error, Result};
use crate::types::*;

/// Rows per statement when bulk-loading link tables.
const LINK_CHUNK_SIZE: usize = 400;

const POST_COLUMNS: &str = "id, title, slug, content, excerpt, status, published_at, cover_image_url, \
     ogp_image_url, view_count, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, title, slug, description, content, demo_url, github_url, \
     cover_image_url, gallery_images, start_date, end_date, status, steps_count, used_ai, tech_stack, \
     created_at, updated_at";

const TAG_COLUMNS: &str = "id, name, slug, description, color, created_at";

const IN_PROGRESS_COLUMNS: &str = "id, title, description, status, progress_rate, started_at, \
     completed_at, completed_project_id, created_at, updated_at";

const PAGE_COLUMNS: &str = "id, page_type, content, metadata, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database, mostly useful for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn query_list<T, F>(&self, sql: &str, values: &[Value], map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), map)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

// Fixed width so that text comparison in SQL orders chronologically, and
// full precision so a stored value reads back equal to what was written.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(parse_datetime(&row.get::<_, String>(idx)?))
}

fn optional_datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row.get::<_, Option<String>>(idx)?.map(|s| parse_datetime(&s)))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn text_values(items: &[String]) -> Vec<Value> {
    items.iter().map(|s| Value::Text(s.clone())).collect()
}

/// Unique and primary key violations become `AlreadyExists`; anything else
/// (including foreign key failures) stays a database error.
fn map_constraint(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return Error::AlreadyExists;
        }
    }
    Error::from(err)
}

macro_rules! text_enum_sql {
    ($($ty:ident),+) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let s = value.as_str()?;
                    $ty::parse(s).ok_or_else(|| {
                        FromSqlError::Other(format!("unknown {} '{}'", stringify!($ty), s).into())
                    })
                }
            }
        )+
    };
}

text_enum_sql!(PostStatus, ProjectStatus, ProgressStatus, PageType);

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: json_column(row, 3)?,
        excerpt: row.get(4)?,
        status: row.get(5)?,
        published_at: optional_datetime_column(row, 6)?,
        cover_image_url: row.get(7)?,
        ogp_image_url: row.get(8)?,
        view_count: row.get(9)?,
        created_at: datetime_column(row, 10)?,
        updated_at: datetime_column(row, 11)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        content: json_column(row, 4)?,
        demo_url: row.get(5)?,
        github_url: row.get(6)?,
        cover_image_url: row.get(7)?,
        gallery_images: json_column(row, 8)?,
        start_date: date_column(row, 9)?,
        end_date: date_column(row, 10)?,
        status: row.get(11)?,
        steps_count: row.get(12)?,
        used_ai: json_column(row, 13)?,
        tech_stack: json_column(row, 14)?,
        created_at: datetime_column(row, 15)?,
        updated_at: datetime_column(row, 16)?,
    })
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        created_at: datetime_column(row, 5)?,
    })
}

fn in_progress_from_row(row: &Row<'_>) -> rusqlite::Result<InProgress> {
    Ok(InProgress {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        progress_rate: row.get(4)?,
        started_at: optional_datetime_column(row, 5)?,
        completed_at: optional_datetime_column(row, 6)?,
        completed_project_id: row.get(7)?,
        created_at: datetime_column(row, 8)?,
        updated_at: datetime_column(row, 9)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        page_type: row.get(1)?,
        content: json_column(row, 2)?,
        metadata: json_column(row, 3)?,
        created_at: datetime_column(row, 4)?,
        updated_at: datetime_column(row, 5)?,
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        owner_id: row.get(0)?,
        target_id: row.get(1)?,
    })
}

impl SqliteStore {
    fn write_links(&self, table: LinkTable, links: &[Link], or_ignore: bool) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "INSERT {}INTO {} ({}, {}) VALUES {}",
            if or_ignore { "OR IGNORE " } else { "" },
            table.table(),
            table.owner_column(),
            table.target_column(),
            vec!["(?, ?)"; links.len()].join(", "),
        );
        let values: Vec<Value> = links
            .iter()
            .flat_map(|l| [Value::Text(l.owner_id.clone()), Value::Text(l.target_id.clone())])
            .collect();

        self.conn()
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(map_constraint)?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Post operations

    fn insert_post(&self, post: &Post) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO posts (id, title, slug, content, excerpt, status, published_at,
                    cover_image_url, ogp_image_url, view_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    post.id,
                    post.title,
                    post.slug,
                    post.content.to_string(),
                    post.excerpt,
                    post.status,
                    post.published_at.as_ref().map(format_datetime),
                    post.cover_image_url,
                    post.ogp_image_url,
                    post.view_count,
                    format_datetime(&post.created_at),
                    format_datetime(&post.updated_at),
                ],
            )
            .map_err(map_constraint)?;
        Ok(())
    }

    fn update_post(&self, post: &Post) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE posts SET title = ?1, slug = ?2, content = ?3, excerpt = ?4, status = ?5,
                    published_at = ?6, cover_image_url = ?7, ogp_image_url = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    post.title,
                    post.slug,
                    post.content.to_string(),
                    post.excerpt,
                    post.status,
                    post.published_at.as_ref().map(format_datetime),
                    post.cover_image_url,
                    post.ogp_image_url,
                    format_datetime(&post.updated_at),
                    post.id,
                ],
            )
            .map_err(map_constraint)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_post(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn get_post(&self, id: &str) -> Result<Option<Post>> {
        self.conn()
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                params![id],
                post_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        self.conn()
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE slug = ?1"),
                params![slug],
                post_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let mut sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE 1 = 1");
        let mut values = Vec::new();

        if let Some(now) = &query.visible_at {
            sql.push_str(
                " AND (status = 'published' OR (status = 'scheduled' AND published_at <= ?))",
            );
            values.push(Value::Text(format_datetime(now)));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(ids) = &query.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(" AND id IN ({})", placeholders(ids.len())));
            values.extend(text_values(ids));
        }
        sql.push_str(" ORDER BY COALESCE(published_at, created_at) DESC, id LIMIT ? OFFSET ?");
        values.push(Value::Integer(query.limit.unwrap_or(-1)));
        values.push(Value::Integer(query.offset));

        self.query_list(&sql, &values, post_from_row)
    }

    fn increment_post_views(&self, id: &str) -> Result<i64> {
        self.conn()
            .query_row(
                "UPDATE posts SET view_count = view_count + 1 WHERE id = ?1 RETURNING view_count",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(Error::NotFound)
    }

    fn upsert_post(&self, post: &Post) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO posts (id, title, slug, content, excerpt, status, published_at,
                    cover_image_url, ogp_image_url, view_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT (id) DO UPDATE SET
                    title = excluded.title,
                    slug = excluded.slug,
                    content = excluded.content,
                    excerpt = excluded.excerpt,
                    status = excluded.status,
                    published_at = excluded.published_at,
                    cover_image_url = excluded.cover_image_url,
                    ogp_image_url = excluded.ogp_image_url,
                    view_count = excluded.view_count,
                    updated_at = excluded.updated_at",
                params![
                    post.id,
                    post.title,
                    post.slug,
                    post.content.to_string(),
                    post.excerpt,
                    post.status,
                    post.published_at.as_ref().map(format_datetime),
                    post.cover_image_url,
                    post.ogp_image_url,
                    post.view_count,
                    format_datetime(&post.created_at),
                    format_datetime(&post.updated_at),
                ],
            )
            .map_err(map_constraint)?;
        Ok(())
    }

    // Project operations

    fn insert_project(&self, project: &Project) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO projects (id, title, slug, description, content, demo_url, github_url,
                    cover_image_url, gallery_images, start_date, end_date, status, steps_count,
                    used_ai, tech_stack, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    project.id,
                    project.title,
                    project.slug,
                    project.description,
                    project.content.to_string(),
                    project.demo_url,
                    project.github_url,
                    project.cover_image_url,
                    serde_json::to_string(&project.gallery_images)?,
                    project.start_date.as_ref().map(format_date),
                    project.end_date.as_ref().map(format_date),
                    project.status,
                    project.steps_count,
                    serde_json::to_string(&project.used_ai)?,
                    serde_json::to_string(&project.tech_stack)?,
                    format_datetime(&project.created_at),
                    format_datetime(&project.updated_at),
                ],
            )
            .map_err(map_constraint)?;
        Ok(())
    }

    fn update_project(&self, project: &Project) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE projects SET title = ?1, slug = ?2, description = ?3, content = ?4,
                    demo_url = ?5, github_url = ?6, cover_image_url = ?7, gallery_images = ?8,
                    start_date = ?9, end_date = ?10, status = ?11, steps_count = ?12,
                    used_ai = ?13, tech_stack = ?14, updated_at = ?15
                 WHERE id = ?16",
                params![
                    project.title,
                    project.slug,
                    project.description,
                    project.content.to_string(),
                    project.demo_url,
                    project.github_url,
                    project.cover_image_url,
                    serde_json::to_string(&project.gallery_images)?,
                    project.start_date.as_ref().map(format_date),
                    project.end_date.as_ref().map(format_date),
                    project.status,
                    project.steps_count,
                    serde_json::to_string(&project.used_ai)?,
                    serde_json::to_string(&project.tech_stack)?,
                    format_datetime(&project.updated_at),
                    project.id,
                ],
            )
            .map_err(map_constraint)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_project(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.conn()
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                project_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_project_by_slug(&self, slug: &str) -> Result<Option<Project>> {
        self.conn()
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = ?1"),
                params![slug],
                project_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>> {
        let mut sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE 1 = 1");
        let mut values = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(ids) = &query.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(" AND id IN ({})", placeholders(ids.len())));
            values.extend(text_values(ids));
        }
        sql.push_str(
            " ORDER BY start_date IS NULL, start_date DESC, created_at DESC, id LIMIT ? OFFSET ?",
        );
        values.push(Value::Integer(query.limit.unwrap_or(-1)));
        values.push(Value::Integer(query.offset));

        self.query_list(&sql, &values, project_from_row)
    }

    fn upsert_project(&self, project: &Project) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO projects (id, title, slug, description, content, demo_url, github_url,
                    cover_image_url, gallery_images, start_date, end_date, status, steps_count,
                    used_ai, tech_stack, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                 ON CONFLICT (id) DO UPDATE SET
                    title = excluded.title,
                    slug = excluded.slug,
                    description = excluded.description,
                    content = excluded.content,
                    demo_url = excluded.demo_url,
                    github_url = excluded.github_url,
                    cover_image_url = excluded.cover_image_url,
                    gallery_images = excluded.gallery_images,
                    start_date = excluded.start_date,
                    end_date = excluded.end_date,
                    status = excluded.status,
                    steps_count = excluded.steps_count,
                    used_ai = excluded.used_ai,
                    tech_stack = excluded.tech_stack,
                    updated_at = excluded.updated_at",
                params![
                    project.id,
                    project.title,
                    project.slug,
                    project.description,
                    project.content.to_string(),
                    project.demo_url,
                    project.github_url,
                    project.cover_image_url,
                    serde_json::to_string(&project.gallery_images)?,
                    project.start_date.as_ref().map(format_date),
                    project.end_date.as_ref().map(format_date),
                    project.status,
                    project.steps_count,
                    serde_json::to_string(&project.used_ai)?,
                    serde_json::to_string(&project.tech_stack)?,
                    format_datetime(&project.created_at),
                    format_datetime(&project.updated_at),
                ],
            )
            .map_err(map_constraint)?;
        Ok(())
    }

    // Tag operations

    fn insert_tag(&self, tag: &Tag) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO tags (id, name, slug, description, color, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    tag.id,
                    tag.name,
                    tag.slug,
                    tag.description,
                    tag.color,
                    format_datetime(&tag.created_at),
                ],
            )
            .map_err(map_constraint)?;
        Ok(())
    }

    fn update_tag(&self, tag: &Tag) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE tags SET name = ?1, slug = ?2, description = ?3, color = ?4 WHERE id = ?5",
                params![tag.name, tag.slug, tag.description, tag.color, tag.id],
            )
            .map_err(map_constraint)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_tag(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn get_tag(&self, id: &str) -> Result<Option<Tag>> {
        self.conn()
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1"),
                params![id],
                tag_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        self.conn()
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE slug = ?1"),
                params![slug],
                tag_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        self.query_list(
            &format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY name"),
            &[],
            tag_from_row,
        )
    }

    fn list_tags_by_slugs(&self, slugs: &[String]) -> Result<Vec<Tag>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }
        self.query_list(
            &format!(
                "SELECT {TAG_COLUMNS} FROM tags WHERE slug IN ({}) ORDER BY name",
                placeholders(slugs.len())
            ),
            &text_values(slugs),
            tag_from_row,
        )
    }

    fn list_tags_by_ids(&self, ids: &[String]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.query_list(
            &format!(
                "SELECT {TAG_COLUMNS} FROM tags WHERE id IN ({}) ORDER BY name",
                placeholders(ids.len())
            ),
            &text_values(ids),
            tag_from_row,
        )
    }

    fn upsert_tag(&self, tag: &Tag) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO tags (id, name, slug, description, color, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (id) DO UPDATE SET
                    name = excluded.name,
                    slug = excluded.slug,
                    description = excluded.description,
                    color = excluded.color",
                params![
                    tag.id,
                    tag.name,
                    tag.slug,
                    tag.description,
                    tag.color,
                    format_datetime(&tag.created_at),
                ],
            )
            .map_err(map_constraint)?;
        Ok(())
    }

    // In-progress operations

    fn insert_in_progress(&self, item: &InProgress) -> Result<()> {
        self.conn().execute(
            "INSERT INTO in_progress (id, title, description, status, progress_rate, started_at,
                completed_at, completed_project_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.id,
                item.title,
                item.description,
                item.status,
                item.progress_rate,
                item.started_at.as_ref().map(format_datetime),
                item.completed_at.as_ref().map(format_datetime),
                item.completed_project_id,
                format_datetime(&item.created_at),
                format_datetime(&item.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update_in_progress(&self, item: &InProgress) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE in_progress SET title = ?1, description = ?2, status = ?3, progress_rate = ?4,
                started_at = ?5, completed_at = ?6, completed_project_id = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                item.title,
                item.description,
                item.status,
                item.progress_rate,
                item.started_at.as_ref().map(format_datetime),
                item.completed_at.as_ref().map(format_datetime),
                item.completed_project_id,
                format_datetime(&item.updated_at),
                item.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_in_progress(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM in_progress WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn get_in_progress(&self, id: &str) -> Result<Option<InProgress>> {
        self.conn()
            .query_row(
                &format!("SELECT {IN_PROGRESS_COLUMNS} FROM in_progress WHERE id = ?1"),
                params![id],
                in_progress_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_in_progress(&self) -> Result<Vec<InProgress>> {
        self.query_list(
            &format!("SELECT {IN_PROGRESS_COLUMNS} FROM in_progress ORDER BY updated_at DESC, id"),
            &[],
            in_progress_from_row,
        )
    }

    fn upsert_in_progress(&self, item: &InProgress) -> Result<()> {
        self.conn().execute(
            "INSERT INTO in_progress (id, title, description, status, progress_rate, started_at,
                completed_at, completed_project_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                status = excluded.status,
                progress_rate = excluded.progress_rate,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at,
                completed_project_id = excluded.completed_project_id,
                updated_at = excluded.updated_at",
            params![
                item.id,
                item.title,
                item.description,
                item.status,
                item.progress_rate,
                item.started_at.as_ref().map(format_datetime),
                item.completed_at.as_ref().map(format_datetime),
                item.completed_project_id,
                format_datetime(&item.created_at),
                format_datetime(&item.updated_at),
            ],
        )?;
        Ok(())
    }

    // Page operations

    fn get_page(&self, page_type: PageType) -> Result<Option<Page>> {
        self.conn()
            .query_row(
                &format!("SELECT {PAGE_COLUMNS} FROM pages WHERE page_type = ?1"),
                params![page_type],
                page_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_pages(&self) -> Result<Vec<Page>> {
        self.query_list(
            &format!("SELECT {PAGE_COLUMNS} FROM pages ORDER BY page_type"),
            &[],
            page_from_row,
        )
    }

    fn upsert_page(&self, page: &Page) -> Result<()> {
        self.conn().execute(
            "INSERT INTO pages (id, page_type, content, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (page_type) DO UPDATE SET
                content = excluded.content,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at",
            params![
                page.id,
                page.page_type,
                page.content.to_string(),
                page.metadata.to_string(),
                format_datetime(&page.created_at),
                format_datetime(&page.updated_at),
            ],
        )?;
        Ok(())
    }

    // Link operations

    fn list_links(&self, table: LinkTable, owner_id: &str) -> Result<Vec<Link>> {
        self.query_list(
            &format!(
                "SELECT {}, {} FROM {} WHERE {} = ? ORDER BY rowid",
                table.owner_column(),
                table.target_column(),
                table.table(),
                table.owner_column(),
            ),
            &[Value::Text(owner_id.to_string())],
            link_from_row,
        )
    }

    fn list_links_by_targets(&self, table: LinkTable, target_ids: &[String]) -> Result<Vec<Link>> {
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.query_list(
            &format!(
                "SELECT {}, {} FROM {} WHERE {} IN ({}) ORDER BY rowid",
                table.owner_column(),
                table.target_column(),
                table.table(),
                table.target_column(),
                placeholders(target_ids.len()),
            ),
            &text_values(target_ids),
            link_from_row,
        )
    }

    fn list_all_links(&self, table: LinkTable) -> Result<Vec<Link>> {
        self.query_list(
            &format!(
                "SELECT {}, {} FROM {} ORDER BY rowid",
                table.owner_column(),
                table.target_column(),
                table.table(),
            ),
            &[],
            link_from_row,
        )
    }

    fn count_links_by_target(&self, table: LinkTable) -> Result<HashMap<String, i64>> {
        let counts = self.query_list(
            &format!(
                "SELECT {}, COUNT(*) FROM {} GROUP BY {}",
                table.target_column(),
                table.table(),
                table.target_column(),
            ),
            &[],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok(counts.into_iter().collect())
    }

    fn insert_links(&self, table: LinkTable, links: &[Link]) -> Result<()> {
        self.write_links(table, links, false)
    }

    fn delete_links(&self, table: LinkTable, owner_id: &str) -> Result<usize> {
        let rows = self.conn().execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1",
                table.table(),
                table.owner_column()
            ),
            params![owner_id],
        )?;
        Ok(rows)
    }

    fn upsert_links(&self, table: LinkTable, links: &[Link]) -> Result<()> {
        for chunk in links.chunks(LINK_CHUNK_SIZE) {
            self.write_links(table, chunk, true)?;
        }
        Ok(())
    }
}
