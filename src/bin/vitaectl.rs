// vitaectl - appearance and page resolution against a running vitae site.
// Commands: status, toggle-dark, theme, themes, resolve

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use vitae::client::{SiteClient, DEFAULT_TIMEOUT_SECS};
use vitae::content::classify_content;
use vitae::error::SiteError;
use vitae::resolver::{self, RenderDecision};
use vitae::theme::{Appearance, AppearanceHook, FileStorage, ThemeId, ThemeState};

#[derive(Parser)]
#[command(name = "vitaectl")]
#[command(version, about = "Manage a vitae site's appearance from the command line")]
struct Cli {
    /// Base URL of the site
    #[arg(long, global = true, default_value = "http://localhost:8000")]
    server: String,

    /// File holding this device's appearance preferences
    #[arg(long, global = true, default_value = "vitae-appearance.json")]
    state_file: PathBuf,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Print each appearance change as it is applied
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current appearance (local preferences, then the shared record)
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Flip dark mode
    ToggleDark,

    /// Switch to another theme
    Theme {
        /// One of: minimal, modern, aesthetic, professional, academic
        #[arg(value_parser = parse_theme)]
        id: ThemeId,
    },

    /// List available themes
    Themes,

    /// Show what the site would render for a path
    Resolve {
        /// Request path, e.g. /about or /notes/rust
        path: String,
    },
}

fn parse_theme(raw: &str) -> Result<ThemeId, String> {
    ThemeId::from_id(&raw.trim().to_lowercase()).ok_or_else(|| {
        let ids: Vec<&str> = ThemeId::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown theme '{}' (expected one of: {})", raw, ids.join(", "))
    })
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), SiteError> {
    match cli.command {
        Commands::Themes => {
            print_themes();
            Ok(())
        }
        Commands::Resolve { ref path } => {
            let client = SiteClient::new(&cli.server, Duration::from_secs(cli.timeout))?;
            print_resolution(&client, path);
            Ok(())
        }
        Commands::Status { json } => {
            let state = theme_state(&cli)?;
            state.hydrate();
            state.flush();
            print_appearance(&state.appearance(), json)
        }
        Commands::ToggleDark => {
            let state = theme_state(&cli)?;
            state.hydrate();
            state.flush();
            state.toggle_dark_mode();
            state.flush();
            print_appearance(&state.appearance(), false)
        }
        Commands::Theme { id } => {
            let state = theme_state(&cli)?;
            state.hydrate();
            state.flush();
            state.set_theme(id);
            state.flush();
            print_appearance(&state.appearance(), false)
        }
    }
}

fn theme_state(cli: &Cli) -> Result<ThemeState, SiteError> {
    let client = SiteClient::new(&cli.server, Duration::from_secs(cli.timeout))?;
    let storage = FileStorage::new(cli.state_file.clone());

    let hook: Option<AppearanceHook> = if cli.verbose {
        Some(Arc::new(|a: &Appearance| {
            eprintln!(
                "  applied: theme={} dark_mode={}",
                a.theme.as_str(),
                a.dark_mode
            );
        }))
    } else {
        None
    };

    Ok(ThemeState::new(Arc::new(storage), Arc::new(client), hook))
}

fn print_appearance(appearance: &Appearance, json: bool) -> Result<(), SiteError> {
    if json {
        let out = serde_json::to_string_pretty(appearance)
            .map_err(|e| SiteError::ParseFailure(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    println!(
        "Theme:     {} {}",
        appearance.theme.icon(),
        appearance.theme.label()
    );
    println!(
        "Dark mode: {}",
        if appearance.dark_mode { "on" } else { "off" }
    );
    match appearance.settings_ref {
        Some(id) => println!("Record:    #{}", id),
        None => println!("Record:    (not synced)"),
    }
    Ok(())
}

fn print_themes() {
    for theme in ThemeId::ALL {
        println!(
            "{} {:<13} {:<14} {}",
            theme.icon(),
            theme.as_str(),
            theme.label(),
            theme.description()
        );
    }
}

fn print_resolution(client: &SiteClient, path: &str) {
    let segments: Vec<&str> = path.split('/').collect();
    let slug = resolver::normalize_slug(&segments);

    match resolver::resolve(client, &segments) {
        RenderDecision::RenderSection(section) => {
            println!("/{} -> section \"{}\"", slug, section.title());
        }
        RenderDecision::RenderPage(page) => {
            println!("/{} -> page #{} \"{}\"", slug, page.id, page.title);
            println!("  content: {:?}", classify_content(&page.content));
            if let Some(desc) = page.meta_description {
                println!("  description: {}", desc);
            }
        }
        RenderDecision::NotFound => {
            println!("/{} -> not found (404)", slug);
        }
    }
}
