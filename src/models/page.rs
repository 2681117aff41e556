use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::SiteError;
use crate::resolver::{normalize_slug, PageLookup};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Page {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub meta_description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PageForm {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub meta_description: Option<String>,
}

impl PageForm {
    /// Check required fields and normalize the slug the same way the
    /// dynamic route does, so a stored page is always reachable.
    pub fn normalized(&self) -> Result<PageForm, String> {
        let slug = normalize_slug(&[self.slug.as_str()]);
        if slug.is_empty() || self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err("Please fill in all required fields (slug, title, content)".to_string());
        }

        Ok(PageForm {
            slug,
            title: self.title.trim().to_string(),
            content: self.content.clone(),
            meta_description: self
                .meta_description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        })
    }
}

impl Page {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Page {
            id: row.get("id")?,
            slug: row.get("slug")?,
            title: row.get("title")?,
            content: row.get("content")?,
            meta_description: row.get("meta_description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row("SELECT * FROM pages WHERE id = ?1", params![id], Self::from_row)
            .ok()
    }

    /// Keyed lookup used by the dynamic route. Unlike the other finders this
    /// keeps storage errors apart from absence so callers can log them.
    pub fn find_by_slug(pool: &DbPool, slug: &str) -> Result<Option<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            "SELECT * FROM pages WHERE slug = ?1",
            params![slug],
            Self::from_row,
        )
        .optional()
        .map_err(|e| e.to_string())
    }

    pub fn list(pool: &DbPool) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare("SELECT * FROM pages ORDER BY created_at DESC, id DESC") {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map([], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn count(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))
            .unwrap_or(0)
    }

    /// Expects a form that already went through `PageForm::normalized`.
    pub fn create(pool: &DbPool, form: &PageForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO pages (slug, title, content, meta_description)
             VALUES (?1, ?2, ?3, ?4)",
            params![form.slug, form.title, form.content, form.meta_description],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    /// Updates title, content and description. The slug is fixed at creation.
    pub fn update(pool: &DbPool, id: i64, form: &PageForm) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE pages SET title = ?1, content = ?2, meta_description = ?3,
             updated_at = CURRENT_TIMESTAMP WHERE id = ?4",
            params![form.title, form.content, form.meta_description, id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn delete(pool: &DbPool, id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM pages WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

impl PageLookup for DbPool {
    fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, SiteError> {
        Page::find_by_slug(self, slug).map_err(SiteError::FetchFailure)
    }
}
