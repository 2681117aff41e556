#[macro_use]
extern crate rocket;

pub mod boot;
pub mod client;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod render;
pub mod resolver;
pub mod routes;
pub mod theme;


use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::fs::{FileServer, Options};
use rocket::http::Header;
use rocket::response::content::RawHtml;
use rocket::{Build, Rocket};

use config::AppConfig;
use db::DbPool;

/// API responses carry live settings and content; keep them out of caches.
pub struct NoCacheApi;

#[rocket::async_trait]
impl Fairing for NoCacheApi {
    fn info(&self) -> Info {
        Info {
            name: "No-Cache API Responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r rocket::Request<'_>, res: &mut rocket::Response<'r>) {
        if req.uri().path().starts_with("/api") {
            res.set_header(Header::new(
                "Cache-Control",
                "no-store, no-cache, must-revalidate, max-age=0",
            ));
            res.set_header(Header::new("Pragma", "no-cache"));
        }
    }
}

#[catch(404)]
fn not_found() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>404</h1><p>Page not found.</p><a href='/'>← Home</a></body></html>".to_string())
}

#[catch(500)]
fn server_error() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>500</h1><p>Internal server error.</p><a href='/'>← Home</a></body></html>".to_string())
}

/// Assemble the site. The pool must already be migrated.
pub fn server(figment: Figment, config: AppConfig, pool: DbPool) -> Rocket<Build> {
    let static_dir = config.static_dir.clone();

    rocket::custom(figment)
        .manage(pool)
        .manage(config)
        .attach(NoCacheApi)
        .mount(
            "/static",
            FileServer::new(static_dir, Options::Index | Options::Missing),
        )
        .mount("/", routes::public::routes())
        .mount("/api", routes::api::routes())
        .register("/", catchers![not_found, server_error])
}
