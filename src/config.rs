use rocket::figment::Figment;
use serde::{Deserialize, Serialize};

/// Site settings read from Rocket's figment, so they can be set in
/// `Rocket.toml` or as `ROCKET_DATABASE_PATH`, `ROCKET_STATIC_DIR` and
/// `ROCKET_GUIDE_PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: String,
    pub static_dir: String,
    pub guide_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: "site/db/vitae.db".to_string(),
            static_dir: "site/static".to_string(),
            guide_path: "NAVBAR_AND_PAGES_GUIDE.md".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> Self {
        match figment.extract::<AppConfig>() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid site configuration, using defaults: {}", e);
                AppConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::providers::Serialized;

    #[test]
    fn missing_keys_take_defaults() {
        let figment = Figment::from(Serialized::defaults(rocket::Config::default()));
        assert_eq!(AppConfig::from_figment(&figment), AppConfig::default());
    }

    #[test]
    fn keys_override_defaults() {
        let figment = Figment::from(Serialized::defaults(rocket::Config::default()))
            .merge(("database_path", "/tmp/other.db"))
            .merge(("guide_path", "docs/guide.md"));
        let config = AppConfig::from_figment(&figment);
        assert_eq!(config.database_path, "/tmp/other.db");
        assert_eq!(config.guide_path, "docs/guide.md");
        assert_eq!(config.static_dir, "site/static");
    }
}
