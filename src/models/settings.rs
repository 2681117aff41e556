use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::theme::ThemeId;

/// Appearance record shared by every visitor and device.
///
/// `id` is absent when the server answered with fallback defaults instead of
/// a stored row.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub theme: ThemeId,
}

/// Partial update body. Absent fields are left untouched.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeId>,
}

impl SettingsPatch {
    pub fn full(dark_mode: bool, theme: ThemeId) -> Self {
        SettingsPatch {
            dark_mode: Some(dark_mode),
            theme: Some(theme),
        }
    }

    pub fn dark_mode(dark_mode: bool) -> Self {
        SettingsPatch {
            dark_mode: Some(dark_mode),
            theme: None,
        }
    }

    pub fn theme(theme: ThemeId) -> Self {
        SettingsPatch {
            dark_mode: None,
            theme: Some(theme),
        }
    }
}

impl Settings {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let dark_raw: i64 = row.get("dark_mode")?;
        let theme_raw: String = row.get("theme")?;
        Ok(Settings {
            id: Some(row.get("id")?),
            dark_mode: dark_raw != 0,
            theme: ThemeId::from_id(&theme_raw).unwrap_or_default(),
        })
    }

    /// The record the site renders with: the oldest one, if any.
    pub fn current(pool: &DbPool) -> Result<Option<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            "SELECT * FROM settings ORDER BY id ASC LIMIT 1",
            [],
            Self::from_row,
        )
        .optional()
        .map_err(|e| e.to_string())
    }

    /// Inserts a new record; fields missing from the patch take the defaults.
    pub fn create(pool: &DbPool, patch: &SettingsPatch) -> Result<Self, String> {
        let defaults = Settings::default();
        let dark_mode = patch.dark_mode.unwrap_or(defaults.dark_mode);
        let theme = patch.theme.unwrap_or(defaults.theme);

        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO settings (dark_mode, theme) VALUES (?1, ?2)",
            params![dark_mode as i64, theme.as_str()],
        )
        .map_err(|e| e.to_string())?;

        Ok(Settings {
            id: Some(conn.last_insert_rowid()),
            dark_mode,
            theme,
        })
    }

    /// Applies only the fields present in the patch. Returns `Ok(None)` when
    /// no record has this id.
    pub fn update(pool: &DbPool, id: i64, patch: &SettingsPatch) -> Result<Option<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;

        if let Some(dark_mode) = patch.dark_mode {
            conn.execute(
                "UPDATE settings SET dark_mode = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![dark_mode as i64, id],
            )
            .map_err(|e| e.to_string())?;
        }
        if let Some(theme) = patch.theme {
            conn.execute(
                "UPDATE settings SET theme = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![theme.as_str(), id],
            )
            .map_err(|e| e.to_string())?;
        }

        conn.query_row(
            "SELECT * FROM settings WHERE id = ?1",
            params![id],
            Self::from_row,
        )
        .optional()
        .map_err(|e| e.to_string())
    }
}
