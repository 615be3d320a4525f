// src/main.rs
use actix_files::Files;
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::info;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod errors;
mod flows;
mod handlers;
mod models;
mod services;

use crate::config::AppConfig;
use crate::services::{GeminiService, SessionStore, StyleService};

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionStore>,
    max_upload_bytes: usize,
}

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Atelier service...");

    let config = AppConfig::from_env();
    let style_service: Arc<dyn StyleService> = Arc::new(GeminiService::new(&config));
    let sessions = Arc::new(SessionStore::with_limits(style_service, config.session_limits));
    let app_state = AppState {
        sessions: sessions.clone(),
        max_upload_bytes: config.max_upload_bytes,
    };

    actix_web::rt::spawn(async move {
        let mut sweep = tokio::time::interval(SESSION_SWEEP_PERIOD);
        loop {
            sweep.tick().await;
            sessions.purge_expired().await;
        }
    });

    info!(
        "Starting HTTP server on {} (image model {}, text model {})",
        config.server_addr, config.image_model, config.text_model
    );

    let static_dir = config.static_dir.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
            .route("/health", web::get().to(health_check))
            .service(Files::new("/", static_dir.clone()).index_file("index.html"))
    })
    .bind(config.server_addr.as_str())?
    .run()
    .await?;

    Ok(())
}

async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "atelier",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": data.sessions.count().await
    }))
}
