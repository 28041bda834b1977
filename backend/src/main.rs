mod config;
mod explain;
mod inference;
mod ingest;
mod pages;
mod pipeline;
mod retention;
mod routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use explain::Explainer;
use inference::ModelHandle;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = std::env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::from_env();
    let upload_dir = config.upload_dir();
    std::fs::create_dir_all(&upload_dir)?;

    // A broken or missing artifact must not take the service down: the
    // form stays reachable and predictions answer 503 until it is fixed.
    let model = ModelHandle::load(&config.model);
    if let Some(reason) = model.unavailable_reason() {
        log::error!("model is unavailable ({}); serving in degraded mode", reason);
    }

    let explainer = Explainer::new(config.gemini_api_key.clone(), config.explain_timeout);
    if !explainer.is_configured() {
        log::warn!("GEMINI_API_KEY is not set; explanations degrade to a fixed fallback");
    }

    retention::spawn_sweeper(upload_dir, config.upload_ttl, config.sweep_interval);

    let bind_address = config.bind_address.clone();
    let static_dir = config.static_dir.display().to_string();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(model.clone()))
            .app_data(web::Data::new(explainer.clone()))
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
