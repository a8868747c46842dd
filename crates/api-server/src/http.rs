use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::config::AuthConfig;
use shared::llm::{ChatGateway, ImageApiClient};
use shared::repos::Store;
use shared::transcripts::TranscriptClient;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

mod authn;
mod chat;
mod conversations;
mod errors;
mod health;
mod identity;
mod jwks_cache;
mod transcribe;
mod user_data;

pub use jwks_cache::JwksCache;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub auth: AuthConfig,
    pub chat_gateway: Arc<dyn ChatGateway>,
    pub chat_model: String,
    pub image_gateway: Option<Arc<ImageApiClient>>,
    pub transcript_client: TranscriptClient,
    pub max_images_per_reply: usize,
    pub context_turns: i64,
    pub http_client: reqwest::Client,
    pub jwks_cache: JwksCache,
}

#[derive(Clone, Copy)]
pub(super) struct AuthUser {
    pub(super) user_id: Uuid,
}

pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .with_state(app_state.clone());

    let auth_layer_state = app_state.clone();

    let protected_routes = Router::new()
        .route("/chat", post(chat::send_message))
        .route("/transcribe", post(transcribe::transcribe_video))
        .route(
            "/conversations",
            get(conversations::get_conversations).post(conversations::create_conversation),
        )
        .route("/user-data", get(user_data::get_user_data))
        .layer(middleware::from_fn_with_state(
            auth_layer_state,
            authn::auth_middleware,
        ))
        .with_state(app_state);

    public_routes.merge(protected_routes).layer(cors)
}
