use serde::{Deserialize, Serialize};

use crate::error::SiteError;
use crate::models::page::Page;

/// Built-in sections of the one-page site. Their slugs are reserved: the
/// dynamic route always renders the section, never a stored page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Home,
    About,
    Education,
    Experience,
    Research,
    Projects,
    Skills,
    Contact,
}

impl SectionId {
    /// Home-page order.
    pub const ALL: [SectionId; 8] = [
        SectionId::Home,
        SectionId::About,
        SectionId::Education,
        SectionId::Skills,
        SectionId::Experience,
        SectionId::Research,
        SectionId::Projects,
        SectionId::Contact,
    ];

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "home" => Some(SectionId::Home),
            "about" => Some(SectionId::About),
            "education" => Some(SectionId::Education),
            "experience" => Some(SectionId::Experience),
            "research" => Some(SectionId::Research),
            "projects" => Some(SectionId::Projects),
            "skills" => Some(SectionId::Skills),
            "contact" => Some(SectionId::Contact),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Home => "home",
            SectionId::About => "about",
            SectionId::Education => "education",
            SectionId::Experience => "experience",
            SectionId::Research => "research",
            SectionId::Projects => "projects",
            SectionId::Skills => "skills",
            SectionId::Contact => "contact",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionId::Home => "Home",
            SectionId::About => "About",
            SectionId::Education => "Education",
            SectionId::Experience => "Work Experience",
            SectionId::Research => "Research & Publications",
            SectionId::Projects => "Projects",
            SectionId::Skills => "Skills",
            SectionId::Contact => "Contact",
        }
    }

    /// Sections rendered from `Entry` records rather than the site profile.
    pub fn holds_entries(&self) -> bool {
        matches!(
            self,
            SectionId::Education
                | SectionId::Experience
                | SectionId::Research
                | SectionId::Projects
                | SectionId::Skills
        )
    }
}

/// Outcome of resolving a request path. Exactly one of these is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderDecision {
    NotFound,
    RenderSection(SectionId),
    RenderPage(Page),
}

/// Keyed page lookup. `Ok(None)` means the store answered and has no such
/// page; `Err` means the store could not be asked.
pub trait PageLookup {
    fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, SiteError>;
}

/// Join path segments with `/`, trim surrounding whitespace and slashes, and
/// lowercase.
pub fn normalize_slug<S: AsRef<str>>(segments: &[S]) -> String {
    let joined = segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("/");
    joined.trim().trim_matches('/').trim().to_lowercase()
}

pub fn resolve<L, S>(lookup: &L, segments: &[S]) -> RenderDecision
where
    L: PageLookup + ?Sized,
    S: AsRef<str>,
{
    let slug = normalize_slug(segments);
    if slug.is_empty() {
        return RenderDecision::NotFound;
    }

    if let Some(section) = SectionId::from_slug(&slug) {
        log::debug!("Rendering section component for slug: {}", slug);
        return RenderDecision::RenderSection(section);
    }

    match lookup.page_by_slug(&slug) {
        Ok(Some(page)) => RenderDecision::RenderPage(page),
        Ok(None) => {
            log::info!("No page stored for slug \"{}\"", slug);
            RenderDecision::NotFound
        }
        Err(e) => {
            log::warn!("Error fetching page \"{}\", serving 404: {}", slug, e);
            RenderDecision::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::cell::Cell;
    use std::collections::HashMap;

    struct FakeStore {
        pages: HashMap<String, Page>,
        fail: bool,
        lookups: Cell<usize>,
    }

    impl FakeStore {
        fn with(slugs: &[&str]) -> Self {
            let pages = slugs
                .iter()
                .enumerate()
                .map(|(i, slug)| (slug.to_string(), page(i as i64 + 1, slug)))
                .collect();
            FakeStore {
                pages,
                fail: false,
                lookups: Cell::new(0),
            }
        }

        fn failing() -> Self {
            FakeStore {
                pages: HashMap::new(),
                fail: true,
                lookups: Cell::new(0),
            }
        }
    }

    impl PageLookup for FakeStore {
        fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, SiteError> {
            self.lookups.set(self.lookups.get() + 1);
            if self.fail {
                return Err(SiteError::FetchFailure("connection refused".into()));
            }
            Ok(self.pages.get(slug).cloned())
        }
    }

    fn page(id: i64, slug: &str) -> Page {
        let ts = NaiveDateTime::parse_from_str("2024-05-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Page {
            id,
            slug: slug.to_string(),
            title: format!("Title of {}", slug),
            content: "<p>body</p>".to_string(),
            meta_description: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn reserved_slugs_render_sections_with_or_without_a_page() {
        let empty = FakeStore::with(&[]);
        let shadowed = FakeStore::with(&[
            "home", "about", "education", "experience", "research", "projects", "skills", "contact",
        ]);
        for section in SectionId::ALL {
            for store in [&empty, &shadowed] {
                assert_eq!(
                    resolve(store, &[section.as_str()]),
                    RenderDecision::RenderSection(section)
                );
            }
        }
    }

    #[test]
    fn unknown_slug_is_not_found() {
        let store = FakeStore::with(&["blog"]);
        assert_eq!(resolve(&store, &["nope"]), RenderDecision::NotFound);
    }

    #[test]
    fn stored_page_is_rendered() {
        let store = FakeStore::with(&["blog", "notes/rust"]);
        assert_eq!(
            resolve(&store, &["blog"]),
            RenderDecision::RenderPage(page(1, "blog"))
        );
        assert_eq!(
            resolve(&store, &["Notes", "Rust"]),
            RenderDecision::RenderPage(page(2, "notes/rust"))
        );
    }

    #[test]
    fn empty_paths_are_not_found_without_lookup() {
        let store = FakeStore::with(&[""]);
        let none: [&str; 0] = [];
        assert_eq!(resolve(&store, &none), RenderDecision::NotFound);
        assert_eq!(resolve(&store, &[""]), RenderDecision::NotFound);
        assert_eq!(resolve(&store, &["/", " "]), RenderDecision::NotFound);
        assert_eq!(store.lookups.get(), 0);
    }

    #[test]
    fn fetch_failure_degrades_to_not_found() {
        let store = FakeStore::failing();
        assert_eq!(resolve(&store, &["blog"]), RenderDecision::NotFound);
        assert_eq!(store.lookups.get(), 1);
        // Reserved slugs never need the store
        assert_eq!(
            resolve(&store, &["about"]),
            RenderDecision::RenderSection(SectionId::About)
        );
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_slug(&["/About/"]), "about");
        assert_eq!(normalize_slug(&["Blog", "2024", "Post"]), "blog/2024/post");
        assert_eq!(normalize_slug(&["  /talks// "]), "talks");
    }
}
