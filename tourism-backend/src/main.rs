use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use std::sync::Arc;

mod auth;
mod config;
mod controllers;
mod db;
mod errors;
mod homepage;
mod integrations;
mod middleware;
mod models;
mod validation;

use config::Config;
use db::Database;
use integrations::N8nClient;

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub n8n: N8nClient,
}

fn build_cors(origin: Option<&str>) -> Cors {
    let cors = match origin {
        Some(origin) => Cors::default().allowed_origin(origin).supports_credentials(),
        None => Cors::default().allow_any_origin(),
    };
    cors.allow_any_method().allow_any_header().max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).map_err(|e| {
        log::error!("Failed to initialize database: {}", e);
        io::Error::new(io::ErrorKind::Other, e)
    })?;
    let db = Arc::new(db);

    match db.purge_expired_sessions() {
        Ok(0) => {}
        Ok(n) => log::info!("Purged {} expired sessions", n),
        Err(e) => log::warn!("Failed to purge expired sessions: {}", e),
    }

    if let Err(e) = auth::bootstrap_admin(&db, &config) {
        log::error!("Admin bootstrap failed: {}", e);
    }

    std::fs::create_dir_all(&config.upload_dir)?;
    log::info!("Serving uploads from {}", config.upload_dir);

    let n8n = N8nClient::new(db.clone(), &config);
    match &config.n8n_base_url {
        Some(url) => log::info!("[N8N] Relaying events to {}", url),
        None => log::info!("[N8N] No base URL set, relaying to configured channels only"),
    }
    if config.n8n_webhook_secret.is_none() {
        log::warn!("[N8N] N8N_WEBHOOK_SECRET not set; inbound webhooks are disabled");
    }

    let state = web::Data::new(AppState {
        db,
        config: config.clone(),
        n8n,
    });

    log::info!("Starting tourism backend on port {}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(build_cors(state.config.cors_origin.as_deref()))
            .configure(controllers::configure)
            .service(Files::new("/uploads", state.config.upload_dir.clone()))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
