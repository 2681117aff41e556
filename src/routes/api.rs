use std::collections::HashMap;
use std::path::PathBuf;

use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::State;
use serde::Serialize;
use serde_json::{json, Value};

use crate::db::DbPool;
use crate::error::SiteError;
use crate::models::entry::{Entry, EntryForm};
use crate::models::navbar::{LinkType, NavTarget, Navbar, NavbarForm, NavItemForm};
use crate::models::page::{Page, PageForm};
use crate::models::settings::{Settings, SettingsPatch};
use crate::models::site_meta::SiteMeta;
use crate::render::html_escape;
use crate::resolver::{normalize_slug, SectionId};
use crate::theme::ThemeId;

pub type ApiResponse = (Status, Json<Value>);

fn ok<T: Serialize>(status: Status, body: T) -> ApiResponse {
    match serde_json::to_value(body) {
        Ok(value) => (status, Json(value)),
        Err(e) => fail(SiteError::PersistenceFailure(e.to_string())),
    }
}

fn fail(err: SiteError) -> ApiResponse {
    let status = match err {
        SiteError::NotFound => Status::NotFound,
        SiteError::Validation(_) | SiteError::ParseFailure(_) => Status::BadRequest,
        SiteError::FetchFailure(_) | SiteError::PersistenceFailure(_) => {
            log::error!("API error: {}", err);
            Status::InternalServerError
        }
    };
    (status, Json(json!({ "error": err.to_string() })))
}

fn not_found(what: &str) -> ApiResponse {
    (Status::NotFound, Json(json!({ "error": format!("{} not found", what) })))
}

/// Unwrap a JSON body, turning a malformed one into a 400.
fn body<T>(data: Result<Json<T>, json::Error<'_>>) -> Result<T, ApiResponse> {
    data.map(Json::into_inner)
        .map_err(|e| fail(SiteError::Validation(format!("Invalid request body: {}", e))))
}

// ── Pages ──────────────────────────────────────────────

#[get("/pages")]
pub fn pages_list(pool: &State<DbPool>) -> ApiResponse {
    ok(Status::Ok, Page::list(pool))
}

#[get("/pages/slug/<slug..>")]
pub fn page_by_slug(pool: &State<DbPool>, slug: PathBuf) -> ApiResponse {
    let segments: Vec<&str> = slug.iter().filter_map(|s| s.to_str()).collect();
    let slug = normalize_slug(&segments);

    match Page::find_by_slug(pool, &slug) {
        Ok(Some(page)) => ok(Status::Ok, page),
        Ok(None) => not_found("Page"),
        Err(e) => fail(SiteError::FetchFailure(e)),
    }
}

#[post("/pages", data = "<data>")]
pub fn page_create(
    pool: &State<DbPool>,
    data: Result<Json<PageForm>, json::Error<'_>>,
) -> ApiResponse {
    let form = match body(data) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let form = match form.normalized() {
        Ok(f) => f,
        Err(msg) => return fail(SiteError::Validation(msg)),
    };

    match Page::find_by_slug(pool, &form.slug) {
        Ok(Some(_)) => {
            return fail(SiteError::Validation(format!(
                "A page with slug \"{}\" already exists",
                form.slug
            )))
        }
        Ok(None) => {}
        Err(e) => return fail(SiteError::FetchFailure(e)),
    }

    match Page::create(pool, &form) {
        Ok(id) => match Page::find_by_id(pool, id) {
            Some(page) => {
                log::info!("Created page /{}", page.slug);
                ok(Status::Created, page)
            }
            None => not_found("Page"),
        },
        Err(e) => fail(SiteError::PersistenceFailure(e)),
    }
}

#[put("/pages/<id>", data = "<data>")]
pub fn page_update(
    pool: &State<DbPool>,
    id: i64,
    data: Result<Json<PageForm>, json::Error<'_>>,
) -> ApiResponse {
    let existing = match Page::find_by_id(pool, id) {
        Some(p) => p,
        None => return not_found("Page"),
    };
    let mut form = match body(data) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    if form.slug.trim().is_empty() {
        form.slug = existing.slug.clone();
    }
    let form = match form.normalized() {
        Ok(f) => f,
        Err(msg) => return fail(SiteError::Validation(msg)),
    };

    if let Err(e) = Page::update(pool, id, &form) {
        return fail(SiteError::PersistenceFailure(e));
    }
    match Page::find_by_id(pool, id) {
        Some(page) => ok(Status::Ok, page),
        None => not_found("Page"),
    }
}

#[delete("/pages/<id>")]
pub fn page_delete(pool: &State<DbPool>, id: i64) -> ApiResponse {
    if Page::find_by_id(pool, id).is_none() {
        return not_found("Page");
    }
    match Page::delete(pool, id) {
        Ok(()) => ok(Status::Ok, json!({ "message": "Page deleted" })),
        Err(e) => fail(SiteError::PersistenceFailure(e)),
    }
}

// ── Settings ───────────────────────────────────────────

#[get("/settings")]
pub fn settings_get(pool: &State<DbPool>) -> ApiResponse {
    match Settings::current(pool) {
        Ok(settings) => ok(Status::Ok, settings),
        Err(e) => {
            log::error!("Error fetching settings: {}", e);
            ok(Status::Ok, json!({ "dark_mode": false, "theme": ThemeId::default() }))
        }
    }
}

#[post("/settings", data = "<data>")]
pub fn settings_create(
    pool: &State<DbPool>,
    data: Result<Json<SettingsPatch>, json::Error<'_>>,
) -> ApiResponse {
    let patch = match body(data) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match Settings::create(pool, &patch) {
        Ok(settings) => ok(Status::Created, settings),
        Err(e) => fail(SiteError::PersistenceFailure(e)),
    }
}

#[put("/settings/<id>", data = "<data>")]
pub fn settings_update(
    pool: &State<DbPool>,
    id: i64,
    data: Result<Json<SettingsPatch>, json::Error<'_>>,
) -> ApiResponse {
    let patch = match body(data) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match Settings::update(pool, id, &patch) {
        Ok(Some(settings)) => ok(Status::Ok, settings),
        Ok(None) => not_found("Settings"),
        Err(e) => fail(SiteError::PersistenceFailure(e)),
    }
}

// ── Navbar ─────────────────────────────────────────────

#[get("/navbar")]
pub fn navbar_get(pool: &State<DbPool>) -> ApiResponse {
    ok(Status::Ok, Navbar::get(pool))
}

#[put("/navbar", data = "<data>")]
pub fn navbar_save(
    pool: &State<DbPool>,
    data: Result<Json<NavbarForm>, json::Error<'_>>,
) -> ApiResponse {
    let form = match body(data) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    if form.nav_items.iter().any(|i| i.name.trim().is_empty() || i.href.trim().is_empty()) {
        return fail(SiteError::Validation(
            "Every navigation item needs a name and an href".to_string(),
        ));
    }
    match Navbar::save(pool, &form) {
        Ok(navbar) => ok(Status::Ok, navbar),
        Err(e) => fail(SiteError::PersistenceFailure(e)),
    }
}

/// Append a nav item. A page link to a slug with no page behind it gets a
/// placeholder page so the link never leads to a 404.
#[post("/navbar/items", data = "<data>")]
pub fn navbar_add_item(
    pool: &State<DbPool>,
    data: Result<Json<NavItemForm>, json::Error<'_>>,
) -> ApiResponse {
    let form = match body(data) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let item = match form.to_item() {
        Ok(i) => i,
        Err(msg) => return fail(SiteError::Validation(msg)),
    };

    let mut created_page = None;
    if form.link_type == LinkType::Page {
        if let NavTarget::Page(slug) = item.target() {
            match ensure_placeholder_page(pool, &slug, &item.name) {
                Ok(page) => created_page = page,
                Err(e) => return fail(e),
            }
        }
    }

    match Navbar::push_item(pool, item) {
        Ok(navbar) => ok(
            Status::Created,
            json!({ "navbar": navbar, "created_page": created_page }),
        ),
        Err(e) => fail(SiteError::PersistenceFailure(e)),
    }
}

fn ensure_placeholder_page(
    pool: &DbPool,
    slug: &str,
    name: &str,
) -> Result<Option<Page>, SiteError> {
    if slug.is_empty() || SectionId::from_slug(slug).is_some() {
        return Ok(None);
    }
    if Page::find_by_slug(pool, slug)
        .map_err(SiteError::FetchFailure)?
        .is_some()
    {
        return Ok(None);
    }

    let form = PageForm {
        slug: slug.to_string(),
        title: name.to_string(),
        content: format!(
            "<h2>{}</h2><p>This is a new page. Edit it from the admin panel.</p>",
            html_escape(name)
        ),
        meta_description: Some(format!("Page about {}", name)),
    };
    let id = Page::create(pool, &form).map_err(SiteError::PersistenceFailure)?;
    log::info!("Created placeholder page /{} for nav item \"{}\"", slug, name);
    Ok(Page::find_by_id(pool, id))
}

// ── Entries ────────────────────────────────────────────

#[get("/entries?<section>")]
pub fn entries_list(pool: &State<DbPool>, section: Option<&str>) -> ApiResponse {
    let filter = match section {
        Some(raw) => match SectionId::from_slug(&raw.trim().to_lowercase()) {
            Some(s) => Some(s),
            None => {
                return fail(SiteError::Validation(format!("Unknown section '{}'", raw)))
            }
        },
        None => None,
    };
    ok(Status::Ok, Entry::list(pool, filter))
}

#[post("/entries", data = "<data>")]
pub fn entry_create(
    pool: &State<DbPool>,
    data: Result<Json<EntryForm>, json::Error<'_>>,
) -> ApiResponse {
    let form = match body(data) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let section = match form.validate() {
        Ok(s) => s,
        Err(msg) => return fail(SiteError::Validation(msg)),
    };
    match Entry::create(pool, section, &form) {
        Ok(id) => match Entry::find_by_id(pool, id) {
            Some(entry) => ok(Status::Created, entry),
            None => not_found("Entry"),
        },
        Err(e) => fail(SiteError::PersistenceFailure(e)),
    }
}

#[put("/entries/<id>", data = "<data>")]
pub fn entry_update(
    pool: &State<DbPool>,
    id: i64,
    data: Result<Json<EntryForm>, json::Error<'_>>,
) -> ApiResponse {
    if Entry::find_by_id(pool, id).is_none() {
        return not_found("Entry");
    }
    let form = match body(data) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let section = match form.validate() {
        Ok(s) => s,
        Err(msg) => return fail(SiteError::Validation(msg)),
    };
    if let Err(e) = Entry::update(pool, id, section, &form) {
        return fail(SiteError::PersistenceFailure(e));
    }
    match Entry::find_by_id(pool, id) {
        Some(entry) => ok(Status::Ok, entry),
        None => not_found("Entry"),
    }
}

#[delete("/entries/<id>")]
pub fn entry_delete(pool: &State<DbPool>, id: i64) -> ApiResponse {
    if Entry::find_by_id(pool, id).is_none() {
        return not_found("Entry");
    }
    match Entry::delete(pool, id) {
        Ok(()) => ok(Status::Ok, json!({ "message": "Entry deleted" })),
        Err(e) => fail(SiteError::PersistenceFailure(e)),
    }
}

// ── Site profile ───────────────────────────────────────

#[get("/site")]
pub fn site_get(pool: &State<DbPool>) -> ApiResponse {
    ok(Status::Ok, SiteMeta::all(pool))
}

#[put("/site", data = "<data>")]
pub fn site_update(
    pool: &State<DbPool>,
    data: Result<Json<HashMap<String, String>>, json::Error<'_>>,
) -> ApiResponse {
    let values = match body(data) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Some(key) = values.keys().find(|k| k.trim().is_empty()) {
        return fail(SiteError::Validation(format!("Invalid key '{}'", key)));
    }
    match SiteMeta::set_many(pool, &values) {
        Ok(()) => ok(Status::Ok, SiteMeta::all(pool)),
        Err(e) => fail(SiteError::PersistenceFailure(e)),
    }
}

// ── Themes ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ThemeInfo {
    pub id: ThemeId,
    pub label: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

#[get("/themes")]
pub fn themes_list() -> Json<Vec<ThemeInfo>> {
    Json(
        ThemeId::ALL
            .iter()
            .map(|t| ThemeInfo {
                id: *t,
                label: t.label(),
                description: t.description(),
                icon: t.icon(),
            })
            .collect(),
    )
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        pages_list,
        page_by_slug,
        page_create,
        page_update,
        page_delete,
        settings_get,
        settings_create,
        settings_update,
        navbar_get,
        navbar_save,
        navbar_add_item,
        entries_list,
        entry_create,
        entry_update,
        entry_delete,
        site_get,
        site_update,
        themes_list,
    ]
}
