use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::process;

use crate::config::AppConfig;

/// Run the startup checks. Call this before Rocket launches.
/// Creates missing directories, warns about missing optional files and
/// aborts if the database directory can't be used.
pub fn run(config: &AppConfig) {
    info!("Vitae boot check starting...");

    let (warnings, errors) = check(config);

    if errors > 0 {
        error!(
            "Boot check FAILED: {} error(s), {} warning(s). Aborting.",
            errors, warnings
        );
        process::exit(1);
    }

    if warnings > 0 {
        warn!(
            "Boot check passed with {} warning(s). Some features may not work correctly.",
            warnings
        );
    } else {
        info!("Boot check passed.");
    }
}

/// Returns `(warnings, errors)`.
pub fn check(config: &AppConfig) -> (u32, u32) {
    let mut warnings = 0u32;
    let mut errors = 0u32;

    // ── 1. Directories ─────────────────────────────────
    let db_dir = Path::new(&config.database_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    for dir in [db_dir, Path::new(&config.static_dir)] {
        if !dir.exists() {
            match fs::create_dir_all(dir) {
                Ok(_) => info!("  Created directory: {}", dir.display()),
                Err(e) => {
                    error!("  FAILED to create directory {}: {}", dir.display(), e);
                    errors += 1;
                }
            }
        }
    }

    // ── 2. Database directory writable ──────────────────
    if db_dir.exists() {
        let test_file = db_dir.join(".write_test");
        match fs::write(&test_file, "test") {
            Ok(_) => {
                let _ = fs::remove_file(&test_file);
            }
            Err(e) => {
                error!("  Database directory not writable: {}", e);
                errors += 1;
            }
        }
    }

    // ── 3. Admin guide ──────────────────────────────────
    if !Path::new(&config.guide_path).exists() {
        warn!(
            "  Guide file not found: {} (/guide will show a placeholder)",
            config.guide_path
        );
        warnings += 1;
    }

    // ── 4. Rocket.toml exists ───────────────────────────
    if !Path::new("Rocket.toml").exists() {
        warn!("  Rocket.toml not found, using default config");
        warnings += 1;
    }

    (warnings, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_path: dir.path().join("db/site.db").display().to_string(),
            static_dir: dir.path().join("static").display().to_string(),
            guide_path: dir.path().join("missing.md").display().to_string(),
        };

        let (warnings, errors) = check(&config);
        assert_eq!(errors, 0);
        // missing guide, plus Rocket.toml when not run from a configured dir
        assert!(warnings >= 1);
        assert!(dir.path().join("db").is_dir());
        assert!(dir.path().join("static").is_dir());
        assert!(!dir.path().join("db/.write_test").exists());
    }
}
