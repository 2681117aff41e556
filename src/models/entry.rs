use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::resolver::SectionId;

/// One item in a list-style section (a degree, a job, a paper, a project or
/// a skill group).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Entry {
    pub id: i64,
    pub section: SectionId,
    pub title: String,
    pub subtitle: Option<String>,
    pub period: Option<String>,
    pub body: Option<String>,
    pub link: Option<String>,
    pub position: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EntryForm {
    pub section: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub period: Option<String>,
    pub body: Option<String>,
    pub link: Option<String>,
    #[serde(default)]
    pub position: i64,
}

impl EntryForm {
    pub fn section(&self) -> Result<SectionId, String> {
        SectionId::from_slug(&self.section.trim().to_lowercase())
            .filter(|s| s.holds_entries())
            .ok_or_else(|| format!("'{}' is not a section that holds entries", self.section))
    }

    pub fn validate(&self) -> Result<SectionId, String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        self.section()
    }
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Entry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let section_raw: String = row.get("section")?;
        let section = SectionId::from_slug(&section_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown section '{}'", section_raw).into(),
            )
        })?;
        Ok(Entry {
            id: row.get("id")?,
            section,
            title: row.get("title")?,
            subtitle: row.get("subtitle")?,
            period: row.get("period")?,
            body: row.get("body")?,
            link: row.get("link")?,
            position: row.get("position")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row("SELECT * FROM entries WHERE id = ?1", params![id], Self::from_row)
            .ok()
    }

    pub fn list(pool: &DbPool, section: Option<SectionId>) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };

        let (sql, filter) = match section {
            Some(s) => (
                "SELECT * FROM entries WHERE section = ?1 ORDER BY position ASC, id ASC",
                Some(s.as_str()),
            ),
            None => (
                "SELECT * FROM entries ORDER BY section ASC, position ASC, id ASC",
                None,
            ),
        };

        let mut stmt = match conn.prepare(sql) {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let rows = match filter {
            Some(f) => stmt.query_map(params![f], Self::from_row),
            None => stmt.query_map([], Self::from_row),
        };

        rows.map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn create(pool: &DbPool, section: SectionId, form: &EntryForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO entries (section, title, subtitle, period, body, link, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                section.as_str(),
                form.title.trim(),
                blank_to_none(&form.subtitle),
                blank_to_none(&form.period),
                blank_to_none(&form.body),
                blank_to_none(&form.link),
                form.position,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(
        pool: &DbPool,
        id: i64,
        section: SectionId,
        form: &EntryForm,
    ) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE entries SET section = ?1, title = ?2, subtitle = ?3, period = ?4,
             body = ?5, link = ?6, position = ?7 WHERE id = ?8",
            params![
                section.as_str(),
                form.title.trim(),
                blank_to_none(&form.subtitle),
                blank_to_none(&form.period),
                blank_to_none(&form.body),
                blank_to_none(&form.link),
                form.position,
                id,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn delete(pool: &DbPool, id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM entries WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}
