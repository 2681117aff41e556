use std::path::PathBuf;

use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::State;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::render;
use crate::resolver::{self, RenderDecision};

#[get("/")]
pub fn homepage(pool: &State<DbPool>) -> RawHtml<String> {
    RawHtml(render::render_home(pool))
}

#[get("/guide")]
pub fn guide(pool: &State<DbPool>, config: &State<AppConfig>) -> RawHtml<String> {
    let markdown = match std::fs::read_to_string(&config.guide_path) {
        Ok(md) => Some(md),
        Err(e) => {
            log::warn!("Could not read guide {}: {}", config.guide_path, e);
            None
        }
    };
    RawHtml(render::render_guide(pool, markdown.as_deref()))
}

/// Catch-all for every path no other route claimed: a section, a stored
/// page, or the 404 view.
#[get("/<path..>", rank = 20)]
pub fn dynamic_page(pool: &State<DbPool>, path: PathBuf) -> (Status, RawHtml<String>) {
    let segments: Vec<&str> = path.iter().filter_map(|s| s.to_str()).collect();

    match resolver::resolve(pool.inner(), &segments) {
        RenderDecision::RenderSection(section) => (
            Status::Ok,
            RawHtml(render::render_section_page(pool, section)),
        ),
        RenderDecision::RenderPage(page) => (Status::Ok, RawHtml(render::render_page(pool, &page))),
        RenderDecision::NotFound => {
            let slug = resolver::normalize_slug(&segments);
            (
                Status::NotFound,
                RawHtml(render::render_not_found(pool, &slug)),
            )
        }
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![homepage, guide, dynamic_page]
}
