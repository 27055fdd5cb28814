use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use vetserver::api_router::configure_api_routes;
use vetserver::config::AppConfig;
use vetserver::llm::OpenAIClient;
use vetserver::shared::state::AppState;
use vetserver::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env().expect("Failed to load config from env");

    let pool = match create_conn(&config.database_url()) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to create database pool: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("Database pool creation failed: {}", e),
            ));
        }
    };

    if let Err(e) = run_migrations(&pool) {
        error!("Failed to run migrations: {}", e);
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Migration failed: {}", e),
        ));
    }

    let llm_provider = Arc::new(OpenAIClient::new(
        config.llm.api_key.clone(),
        Some(config.llm.base_url.clone()),
    ));

    let app_state = Arc::new(AppState {
        conn: pool,
        config: config.clone(),
        llm_provider,
    });

    let app = configure_api_routes()
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}
