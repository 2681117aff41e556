use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::models::navbar::NavItem;

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn init_pool(path: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder().max_size(10).build(manager)?;

    // Enable WAL mode for better concurrent read performance
    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    conn.execute_batch(
        "
        -- Freeform pages served by the dynamic route
        CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY,
            slug TEXT UNIQUE NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            meta_description TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- Appearance settings (the lowest id is the one the site uses)
        CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY,
            dark_mode INTEGER NOT NULL DEFAULT 0,
            theme TEXT NOT NULL DEFAULT 'modern',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- Navigation bar: brand name + JSON array of {name, href}
        CREATE TABLE IF NOT EXISTS navbar (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            nav_items TEXT NOT NULL DEFAULT '[]',
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- Records listed in the education/experience/research/projects/skills sections
        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY,
            section TEXT NOT NULL,
            title TEXT NOT NULL,
            subtitle TEXT,
            period TEXT,
            body TEXT,
            link TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_entries_section ON entries(section, position);

        -- Site profile (key-value)
        CREATE TABLE IF NOT EXISTS site_meta (
            key TEXT PRIMARY KEY,
            value TEXT
        );
        ",
    )?;

    Ok(())
}

pub fn seed_defaults(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    let defaults = vec![
        // Profile
        ("site_name", "Your Name"),
        ("site_tagline", "Researcher & Engineer"),
        ("site_description", "Personal portfolio and curriculum vitae"),
        // Hero
        ("hero_title", "Hi, I'm Your Name"),
        ("hero_subtitle", "I build things and write about them."),
        // About
        ("about_html", "<p>Tell visitors who you are. Edit this from the admin API.</p>"),
        // Contact
        ("contact_email", ""),
        ("contact_phone", ""),
        ("contact_location", ""),
        ("social_github", ""),
        ("social_linkedin", ""),
        ("social_scholar", ""),
        // Footer
        ("footer_text", ""),
    ];

    for (key, value) in defaults {
        conn.execute(
            "INSERT OR IGNORE INTO site_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
    }

    // Seed the navbar if none exists
    let navbar_count: i64 = conn.query_row("SELECT COUNT(*) FROM navbar", [], |row| row.get(0))?;

    if navbar_count == 0 {
        let site_name: String = conn.query_row(
            "SELECT value FROM site_meta WHERE key = 'site_name'",
            [],
            |row| row.get(0),
        )?;
        let items = serde_json::to_string(&NavItem::defaults())?;
        conn.execute(
            "INSERT INTO navbar (name, nav_items) VALUES (?1, ?2)",
            params![site_name, items],
        )?;
    }

    Ok(())
}
