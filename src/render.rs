use std::collections::HashMap;

use pulldown_cmark::{html, Options, Parser};

use crate::content;
use crate::db::DbPool;
use crate::models::entry::Entry;
use crate::models::navbar::Navbar;
use crate::models::page::Page;
use crate::models::settings::Settings;
use crate::models::site_meta::SiteMeta;
use crate::resolver::SectionId;
use crate::theme;

pub const GUIDE_NOT_FOUND: &str = "# Guide Not Found\n\nThe guide file could not be loaded.";

/// Everything the page shell needs, loaded once per request.
pub struct SiteContext {
    pub meta: HashMap<String, String>,
    pub appearance: Settings,
    pub navbar: Option<Navbar>,
}

impl SiteContext {
    pub fn load(pool: &DbPool) -> Self {
        let appearance = match Settings::current(pool) {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                log::warn!("Could not load appearance settings, using defaults: {}", e);
                Settings::default()
            }
        };
        SiteContext {
            meta: SiteMeta::all(pool),
            appearance,
            navbar: Navbar::get(pool),
        }
    }

    fn sg(&self, key: &str, default: &str) -> String {
        self.meta
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

// ── Pages ─────────────────────────────────────────────

pub fn render_home(pool: &DbPool) -> String {
    let ctx = SiteContext::load(pool);
    let body: String = SectionId::ALL
        .iter()
        .map(|section| render_section(pool, &ctx, *section))
        .collect();

    let title = ctx.sg("site_name", "Portfolio");
    let description = ctx.sg("site_description", "");
    render_shell(&ctx, &title, &description, &body, true)
}

/// A reserved slug visited directly: the section alone on its own page.
pub fn render_section_page(pool: &DbPool, section: SectionId) -> String {
    let ctx = SiteContext::load(pool);
    let body = format!(
        "<div class=\"section-page\">{}</div>",
        render_section(pool, &ctx, section)
    );
    let title = format!("{} | {}", section.title(), ctx.sg("site_name", "Portfolio"));
    let description = ctx.sg("site_description", "");
    render_shell(&ctx, &title, &description, &body, false)
}

pub fn render_page(pool: &DbPool, page: &Page) -> String {
    let ctx = SiteContext::load(pool);
    let body = format!(
        r#"<article class="page">
    <header class="page-header"><h1 class="page-title">{title}</h1></header>
    <div class="prose">{content}</div>
</article>"#,
        title = html_escape(&page.title),
        content = content::render_content(&page.content),
    );

    let title = format!("{} | {}", page.title, ctx.sg("site_name", "Portfolio"));
    let description = page
        .meta_description
        .clone()
        .unwrap_or_else(|| ctx.sg("site_description", ""));
    render_shell(&ctx, &title, &description, &body, false)
}

/// `slug` is the normalized request path; it is echoed back when non-empty.
pub fn render_not_found(pool: &DbPool, slug: &str) -> String {
    let ctx = SiteContext::load(pool);
    render_shell(
        &ctx,
        &format!("Page not found | {}", ctx.sg("site_name", "Portfolio")),
        "",
        &not_found_body(slug),
        false,
    )
}

fn not_found_body(slug: &str) -> String {
    let missing = if slug.is_empty() {
        String::new()
    } else {
        format!(
            "<p class=\"error-detail\">The page for <code>/{}</code> doesn't exist yet.</p>\n",
            html_escape(slug)
        )
    };

    format!(
        r#"<div class="error-page">
    <h1>404</h1>
    <p>Page not found</p>
    {missing}<div class="error-actions">
        <a class="btn btn-primary" href="/">Go Home</a>
        <a class="btn" href="/api/pages">Go to Admin</a>
    </div>
    <p class="error-tip">Tip: create this page through the pages API, or add it to the navbar as a page link.</p>
</div>"#,
        missing = missing,
    )
}

/// Renders the admin guide. `None` means the file couldn't be read.
pub fn render_guide(pool: &DbPool, markdown: Option<&str>) -> String {
    let ctx = SiteContext::load(pool);
    let body = format!(
        "<article class=\"guide prose\">{}</article>",
        markdown_to_html(markdown.unwrap_or(GUIDE_NOT_FOUND))
    );
    let title = format!("Guide | {}", ctx.sg("site_name", "Portfolio"));
    render_shell(&ctx, &title, "", &body, false)
}

pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

// ── Sections ──────────────────────────────────────────

fn render_section(pool: &DbPool, ctx: &SiteContext, section: SectionId) -> String {
    let inner = match section {
        SectionId::Home => return render_hero(ctx),
        SectionId::About => format!(
            "<div class=\"about-body prose\">{}</div>",
            ctx.sg("about_html", "")
        ),
        SectionId::Contact => render_contact(ctx),
        SectionId::Skills => render_skills(&Entry::list(pool, Some(section))),
        _ => render_entries(&Entry::list(pool, Some(section))),
    };

    format!(
        r#"<section id="{id}" class="section section-{id}">
    <h2 class="section-title">{title}</h2>
    {inner}
</section>
"#,
        id = section.as_str(),
        title = html_escape(section.title()),
        inner = inner,
    )
}

fn render_hero(ctx: &SiteContext) -> String {
    format!(
        r##"<section id="home" class="section hero">
    <p class="hero-tagline">{tagline}</p>
    <h1 class="hero-title">{title}</h1>
    <p class="hero-subtitle">{subtitle}</p>
    <div class="hero-actions">
        <a class="btn btn-primary" href="#projects">View Projects</a>
        <a class="btn" href="#contact">Get in Touch</a>
    </div>
</section>
"##,
        tagline = html_escape(&ctx.sg("site_tagline", "")),
        title = html_escape(&ctx.sg("hero_title", &ctx.sg("site_name", ""))),
        subtitle = html_escape(&ctx.sg("hero_subtitle", "")),
    )
}

fn render_entries(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "<p class=\"section-empty\">Nothing here yet.</p>".to_string();
    }

    let mut html = String::from("<div class=\"entries\">");
    for entry in entries {
        let title = match entry.link {
            Some(ref link) => format!(
                "<a href=\"{}\" rel=\"noopener\">{}</a>",
                html_escape(link),
                html_escape(&entry.title)
            ),
            None => html_escape(&entry.title),
        };
        html.push_str(&format!(
            "<article class=\"entry\"><div class=\"entry-head\"><h3 class=\"entry-title\">{}</h3>",
            title
        ));
        if let Some(ref period) = entry.period {
            html.push_str(&format!(
                "<span class=\"entry-period\">{}</span>",
                html_escape(period)
            ));
        }
        html.push_str("</div>");
        if let Some(ref subtitle) = entry.subtitle {
            html.push_str(&format!(
                "<p class=\"entry-subtitle\">{}</p>",
                html_escape(subtitle)
            ));
        }
        if let Some(ref body) = entry.body {
            html.push_str(&format!(
                "<div class=\"entry-body\">{}</div>",
                content::render_content(body)
            ));
        }
        html.push_str("</article>");
    }
    html.push_str("</div>");
    html
}

/// Skill entries are groups: the title names the group and the body is a
/// comma separated list.
fn render_skills(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "<p class=\"section-empty\">Nothing here yet.</p>".to_string();
    }

    let mut html = String::from("<div class=\"skill-groups\">");
    for entry in entries {
        let tags: String = entry
            .body
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("<span class=\"skill-tag\">{}</span>", html_escape(s)))
            .collect();
        html.push_str(&format!(
            "<div class=\"skill-group\"><h3>{}</h3><div class=\"skill-tags\">{}</div></div>",
            html_escape(&entry.title),
            tags
        ));
    }
    html.push_str("</div>");
    html
}

fn render_contact(ctx: &SiteContext) -> String {
    let mut items = String::new();

    let email = ctx.sg("contact_email", "");
    if !email.is_empty() {
        items.push_str(&format!(
            "<li><span>Email</span><a href=\"mailto:{e}\">{e}</a></li>",
            e = html_escape(&email)
        ));
    }
    let phone = ctx.sg("contact_phone", "");
    if !phone.is_empty() {
        items.push_str(&format!(
            "<li><span>Phone</span><a href=\"tel:{p}\">{p}</a></li>",
            p = html_escape(&phone)
        ));
    }
    let location = ctx.sg("contact_location", "");
    if !location.is_empty() {
        items.push_str(&format!(
            "<li><span>Location</span>{}</li>",
            html_escape(&location)
        ));
    }

    let socials: String = [
        ("social_github", "GitHub"),
        ("social_linkedin", "LinkedIn"),
        ("social_scholar", "Google Scholar"),
    ]
    .iter()
    .filter_map(|(key, label)| {
        let url = ctx.sg(key, "");
        if url.is_empty() {
            None
        } else {
            Some(format!(
                "<a class=\"social-link\" href=\"{}\" rel=\"noopener\">{}</a>",
                html_escape(&url),
                label
            ))
        }
    })
    .collect();

    if items.is_empty() && socials.is_empty() {
        return "<p class=\"section-empty\">Contact details coming soon.</p>".to_string();
    }

    format!(
        "<ul class=\"contact-list\">{}</ul><div class=\"social-links\">{}</div>",
        items, socials
    )
}

// ── Shell ─────────────────────────────────────────────

fn render_nav(ctx: &SiteContext, on_home: bool) -> String {
    let brand = ctx
        .navbar
        .as_ref()
        .map(|n| n.name.clone())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| ctx.sg("site_name", "Portfolio"));

    let links: String = ctx
        .navbar
        .as_ref()
        .map(|n| n.nav_items.as_slice())
        .unwrap_or(&[])
        .iter()
        .map(|item| {
            format!(
                "<li><a href=\"{}\">{}</a></li>",
                html_escape(&item.resolved_href(on_home)),
                html_escape(&item.name)
            )
        })
        .collect();

    format!(
        r#"<nav class="navbar">
    <a class="navbar-brand" href="/">{brand}</a>
    <ul class="navbar-links">{links}</ul>
</nav>"#,
        brand = html_escape(&brand),
        links = links,
    )
}

fn render_shell(
    ctx: &SiteContext,
    title: &str,
    description: &str,
    body: &str,
    on_home: bool,
) -> String {
    let active = ctx.appearance.theme;
    let dark = ctx.appearance.dark_mode;
    let site_name = ctx.sg("site_name", "Portfolio");
    let footer = ctx.sg(
        "footer_text",
        &format!("&copy; {} {}", chrono::Utc::now().format("%Y"), html_escape(&site_name)),
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="en" data-theme="{theme}"{dark_class}>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<meta name="description" content="{description}">
{font_link}
<style>
{css_vars}
{default_css}
</style>
</head>
<body>
{nav}
<main class="site-main">
{body}
</main>
<footer class="site-footer"><p>{footer}</p></footer>
</body>
</html>"#,
        theme = active.as_str(),
        dark_class = if dark { " class=\"dark\"" } else { "" },
        title = html_escape(title),
        description = html_escape(description),
        font_link = theme::font_link(active),
        css_vars = theme::css_variables(active, dark),
        default_css = DEFAULT_CSS,
        nav = render_nav(ctx, on_home),
        body = body,
        footer = footer,
    )
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const DEFAULT_CSS: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }

body {
    font-family: var(--font-body);
    color: var(--color-text);
    background: var(--color-bg);
    line-height: 1.6;
}

a { color: var(--color-primary); }

h1, h2, h3 { font-family: var(--font-heading); line-height: 1.2; }

/* ── Navbar ── */
.navbar {
    position: sticky;
    top: 0;
    display: flex;
    align-items: center;
    justify-content: space-between;
    padding: 16px 32px;
    background: var(--color-surface);
    border-bottom: 1px solid var(--color-border);
    z-index: 10;
}

.navbar-brand { font-weight: 700; font-size: 20px; color: var(--color-text); text-decoration: none; }
.navbar-links { list-style: none; display: flex; flex-wrap: wrap; gap: 20px; }
.navbar-links a { color: var(--color-text-secondary); text-decoration: none; }
.navbar-links a:hover { color: var(--color-primary); }

/* ── Sections ── */
.site-main { max-width: 960px; margin: 0 auto; padding: 0 24px; }
.section { padding: 72px 0; border-bottom: 1px solid var(--color-border); }
.section:last-child { border-bottom: none; }
.section-title { font-size: 2rem; margin-bottom: 28px; color: var(--color-primary); }
.section-empty { color: var(--color-text-secondary); font-style: italic; }

.hero { min-height: 70vh; display: flex; flex-direction: column; justify-content: center; }
.hero-tagline { color: var(--color-accent); font-weight: 600; letter-spacing: 0.05em; }
.hero-title { font-size: 3rem; margin: 12px 0; }
.hero-subtitle { font-size: 1.25rem; color: var(--color-text-secondary); }
.hero-actions { margin-top: 28px; display: flex; gap: 12px; }

.btn {
    display: inline-block;
    padding: 10px 22px;
    border: 1px solid var(--color-border);
    border-radius: var(--radius);
    color: var(--color-text);
    text-decoration: none;
}
.btn-primary { background: var(--color-primary); border-color: var(--color-primary); color: var(--color-bg); }

.entries { display: grid; gap: 20px; }
.entry {
    padding: 20px 24px;
    background: var(--color-surface);
    border: 1px solid var(--color-border);
    border-radius: var(--radius);
}
.entry-head { display: flex; justify-content: space-between; gap: 12px; align-items: baseline; }
.entry-title a { color: inherit; }
.entry-period { color: var(--color-text-secondary); font-size: 14px; white-space: nowrap; }
.entry-subtitle { color: var(--color-accent); margin-top: 4px; }
.entry-body { margin-top: 10px; }

.skill-groups { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 20px; }
.skill-group h3 { margin-bottom: 10px; }
.skill-tags { display: flex; flex-wrap: wrap; gap: 8px; }
.skill-tag {
    padding: 4px 12px;
    border-radius: var(--radius);
    background: var(--color-surface);
    border: 1px solid var(--color-border);
    font-size: 14px;
}

.contact-list { list-style: none; display: grid; gap: 10px; }
.contact-list span { display: inline-block; width: 100px; color: var(--color-text-secondary); }
.social-links { margin-top: 20px; display: flex; gap: 16px; }

/* ── Pages ── */
.page, .guide, .section-page { padding: 56px 0; }
.page-title { font-size: 2.5rem; margin-bottom: 24px; }
.prose p, .prose ul, .prose ol, .prose pre, .prose table { margin-bottom: 1em; }
.prose h2, .prose h3 { margin: 1.4em 0 0.6em; }
.prose ul, .prose ol { padding-left: 1.4em; }
.prose code { background: var(--color-surface); padding: 1px 6px; border-radius: 4px; }
.prose pre { background: var(--color-surface); padding: 16px; overflow-x: auto; }
.content-empty { color: var(--color-text-secondary); font-style: italic; }

.error-page { text-align: center; padding: 120px 0; }
.error-page h1 { font-size: 3rem; }
.error-detail { color: var(--color-text-secondary); margin: 8px 0 24px; }
.error-actions { display: flex; justify-content: center; gap: 12px; margin-top: 16px; }
.error-tip { font-size: 12px; color: var(--color-text-secondary); margin-top: 24px; }

.site-footer {
    padding: 32px;
    text-align: center;
    font-size: 14px;
    color: var(--color-text-secondary);
    border-top: 1px solid var(--color-border);
}
"#;
