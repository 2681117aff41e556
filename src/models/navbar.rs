use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::resolver::{normalize_slug, SectionId};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub name: String,
    pub href: String,
}

/// Where a nav link points. Hash links scroll to a section of the one-page
/// site, paths go through the dynamic page route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    Section(SectionId),
    Anchor(String),
    Page(String),
    External(String),
}

impl NavItem {
    pub fn new(name: &str, href: &str) -> Self {
        NavItem {
            name: name.to_string(),
            href: href.to_string(),
        }
    }

    pub fn defaults() -> Vec<NavItem> {
        vec![
            NavItem::new("Home", "#home"),
            NavItem::new("About", "#about"),
            NavItem::new("Education", "#education"),
            NavItem::new("Skills", "#skills"),
            NavItem::new("Work Experience", "#experience"),
            NavItem::new("Research", "#research"),
            NavItem::new("Projects", "#projects"),
            NavItem::new("Contact", "#contact"),
        ]
    }

    pub fn target(&self) -> NavTarget {
        let href = self.href.trim();
        if let Some(anchor) = href.strip_prefix('#') {
            return match SectionId::from_slug(&anchor.to_lowercase()) {
                Some(section) => NavTarget::Section(section),
                None => NavTarget::Anchor(anchor.to_string()),
            };
        }
        if href.starts_with('/') && !href.starts_with("//") {
            return NavTarget::Page(normalize_slug(&[href]));
        }
        NavTarget::External(href.to_string())
    }

    /// Link target as rendered in the navbar. Section anchors only work on
    /// the home page, so other pages link back to `/#section`.
    pub fn resolved_href(&self, on_home: bool) -> String {
        match self.target() {
            NavTarget::Section(section) if on_home => format!("#{}", section.as_str()),
            NavTarget::Section(section) => format!("/#{}", section.as_str()),
            NavTarget::Anchor(anchor) if on_home => format!("#{}", anchor),
            NavTarget::Anchor(anchor) => format!("/#{}", anchor),
            NavTarget::Page(slug) => format!("/{}", slug),
            NavTarget::External(url) => url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Navbar {
    pub id: i64,
    pub name: String,
    pub nav_items: Vec<NavItem>,
}

#[derive(Debug, Deserialize)]
pub struct NavbarForm {
    pub name: String,
    #[serde(default)]
    pub nav_items: Vec<NavItem>,
}

/// Kind of link requested when appending a nav item.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    #[default]
    Hash,
    Page,
    External,
}

#[derive(Debug, Deserialize)]
pub struct NavItemForm {
    pub name: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub link_type: LinkType,
}

impl NavItemForm {
    /// Fill in the href from the name when it was left empty and make sure it
    /// carries the prefix its link type needs.
    pub fn to_item(&self) -> Result<NavItem, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Please enter a name for the navigation item".to_string());
        }
        let href = self.href.trim();

        let href = match self.link_type {
            LinkType::Hash if href.is_empty() => format!("#{}", slug::slugify(name)),
            LinkType::Hash if href.starts_with('#') => href.to_string(),
            LinkType::Hash => format!("#{}", href),
            LinkType::Page if href.is_empty() => format!("/{}", slug::slugify(name)),
            LinkType::Page if href.starts_with('/') => href.to_string(),
            LinkType::Page => format!("/{}", href),
            LinkType::External if href.is_empty() => {
                return Err("External links need an href".to_string())
            }
            LinkType::External => href.to_string(),
        };

        Ok(NavItem::new(name, &href))
    }
}

impl Navbar {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let raw: String = row.get("nav_items")?;
        let nav_items = serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Navbar items are not valid JSON, using none: {}", e);
            Vec::new()
        });
        Ok(Navbar {
            id: row.get("id")?,
            name: row.get("name")?,
            nav_items,
        })
    }

    pub fn get(pool: &DbPool) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM navbar ORDER BY id ASC LIMIT 1",
            [],
            Self::from_row,
        )
        .ok()
    }

    /// Replace the brand name and item list, creating the record if needed.
    pub fn save(pool: &DbPool, form: &NavbarForm) -> Result<Self, String> {
        let items = serde_json::to_string(&form.nav_items).map_err(|e| e.to_string())?;
        let conn = pool.get().map_err(|e| e.to_string())?;

        let existing: Option<i64> = conn
            .query_row("SELECT id FROM navbar ORDER BY id ASC LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        let id = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE navbar SET name = ?1, nav_items = ?2, updated_at = CURRENT_TIMESTAMP
                     WHERE id = ?3",
                    params![form.name, items, id],
                )
                .map_err(|e| e.to_string())?;
                id
            }
            None => {
                conn.execute(
                    "INSERT INTO navbar (name, nav_items) VALUES (?1, ?2)",
                    params![form.name, items],
                )
                .map_err(|e| e.to_string())?;
                conn.last_insert_rowid()
            }
        };

        Ok(Navbar {
            id,
            name: form.name.clone(),
            nav_items: form.nav_items.clone(),
        })
    }

    pub fn push_item(pool: &DbPool, item: NavItem) -> Result<Self, String> {
        let (name, mut nav_items) = match Self::get(pool) {
            Some(navbar) => (navbar.name, navbar.nav_items),
            None => (
                crate::models::site_meta::SiteMeta::get_or(pool, "site_name", ""),
                Vec::new(),
            ),
        };
        nav_items.push(item);
        Self::save(pool, &NavbarForm { name, nav_items })
    }
}
