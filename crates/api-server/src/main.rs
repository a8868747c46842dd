use std::net::SocketAddr;
use std::sync::Arc;

use shared::config::ApiConfig;
use shared::llm::{ImageApiClient, OpenAiCompatGateway};
use shared::repos::Store;
use shared::transcripts::TranscriptClient;
use tracing::{error, info};

mod http;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,axum=info,tower_http=info".to_string()),
        )
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let store = match Store::connect(&config.database_url, config.database_max_connections).await {
        Ok(store) => store,
        Err(err) => {
            error!("failed to connect to postgres: {err}");
            std::process::exit(1);
        }
    };

    let migrator = match sqlx::migrate::Migrator::new(config.migrations_dir.clone()).await {
        Ok(migrator) => migrator,
        Err(err) => {
            error!("failed to load migrations: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = migrator.run(store.pool()).await {
        error!("failed to run migrations: {err}");
        std::process::exit(1);
    }

    let chat_gateway = match OpenAiCompatGateway::new(config.chat_gateway.clone()) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to build chat gateway: {err}");
            std::process::exit(1);
        }
    };

    let image_gateway = match config.image_provider.clone() {
        Some(provider_config) => match ImageApiClient::new(provider_config) {
            Ok(client) => Some(Arc::new(client)),
            Err(err) => {
                error!("failed to build image client: {err}");
                std::process::exit(1);
            }
        },
        None => {
            info!("no image provider configured; replies will carry no images");
            None
        }
    };

    let transcript_client = match TranscriptClient::new(config.transcripts.clone()) {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build transcript client: {err}");
            std::process::exit(1);
        }
    };

    let app = http::build_router(http::AppState {
        store,
        auth: config.auth,
        chat_gateway: Arc::new(chat_gateway),
        chat_model: config.chat_gateway.model,
        image_gateway,
        transcript_client,
        max_images_per_reply: config.max_images_per_reply,
        context_turns: config.context_turns,
        http_client: reqwest::Client::new(),
        jwks_cache: http::JwksCache::new(),
    });

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| "127.0.0.1:8080".parse().expect("valid default bind addr"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind should succeed");

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    axum::serve(listener, app).await.expect("server should run");
}
