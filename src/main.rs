mod api;
mod config;
mod database;
mod middleware;
mod models;
mod python;
mod services;
mod state;
mod utils;

#[cfg(test)]
mod test_support;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Compress, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::database::{MongoDB, MongoProfileStore, ProfileStore};
use crate::python::ProcessInvoker;
use crate::services::{GeminiClient, GenerativeModel};
use crate::state::AppState;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    log::error!("❌ {}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    log::info!("🚀 Starting CareerGap Service...");
    log::info!("🐍 Scripts: {} (interpreter: {})",
        config.scripts.resume.parent().map(|p| p.display().to_string()).unwrap_or_default(),
        config.invoker.interpreter
    );
    log::info!(
        "⚙️  Script pool: {} workers, queue {}, timeout {:?}",
        config.invoker.max_concurrency,
        config.invoker.max_queue,
        config.invoker.timeout
    );

    tokio::fs::create_dir_all(&config.uploads_dir).await?;
    tokio::fs::create_dir_all(&config.tmp_dir).await?;

    // Initialize MongoDB connection
    let db = MongoDB::new(&config.mongodb_uri, config.mongodb_database.as_deref())
        .await
        .map_err(|e| startup_error("Failed to connect to MongoDB", e))?;
    log::info!("✅ MongoDB connected successfully");

    let store: Arc<dyn ProfileStore> = Arc::new(MongoProfileStore::new(db));

    let model: Option<Arc<dyn GenerativeModel>> = match config.gemini.clone() {
        Some(gemini) => {
            log::info!("🤖 Generative model: {}", gemini.model);
            let client = GeminiClient::new(gemini)
                .map_err(|e| startup_error("Failed to build Gemini client", e))?;
            Some(Arc::new(client))
        }
        None => {
            log::warn!("⚠️  GOOGLE_API_KEY not set, model-backed routes will answer 500");
            None
        }
    };

    let invoker = ProcessInvoker::new(config.invoker.clone());
    let host = config.host.clone();
    let port = config.port;
    let client_url = config.client_url.clone();

    let state = web::Data::new(AppState {
        config,
        store,
        invoker: invoker.clone(),
        model,
    });

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    // Generate OpenAPI specification
    let openapi = api::swagger::ApiDoc::openapi();

    // Start HTTP server
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&client_url)
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CACHE_CONTROL,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
            .configure(api::configure)
    })
    .bind((host.as_str(), port))?
    .run();

    let result = server.await;

    log::info!("🛑 Server stopped, cancelling running scripts");
    invoker.shutdown();

    result
}
