use vitae::config::AppConfig;
use vitae::{boot, db};

#[rocket::launch]
fn rocket() -> _ {
    env_logger::init();

    let figment = rocket::Config::figment();
    let config = AppConfig::from_figment(&figment);

    // Boot check: create directories, warn about missing files
    boot::run(&config);

    let pool = db::init_pool(&config.database_path).expect("Failed to initialize database pool");
    db::run_migrations(&pool).expect("Failed to run database migrations");
    db::seed_defaults(&pool).expect("Failed to seed default site data");

    log::info!("Serving {} with database {}", config.static_dir, config.database_path);

    vitae::server(figment, config, pool)
}
