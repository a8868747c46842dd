use axum::Json;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::CreateConversationRequest;

use super::errors::{not_found_response, store_error_response};
use super::{AppState, AuthUser};

const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";

#[derive(Debug, Deserialize)]
pub(super) struct ConversationsQuery {
    #[serde(default)]
    id: Option<Uuid>,
}

/// Without `?id=` lists the caller's conversations by recency; with `?id=`
/// returns the messages of one owned conversation in chronological order.
pub(super) async fn get_conversations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ConversationsQuery>,
) -> Response {
    match query.id {
        Some(conversation_id) => {
            let conversation = match state
                .store
                .get_conversation(conversation_id, user.user_id)
                .await
            {
                Ok(Some(conversation)) => conversation,
                Ok(None) => return not_found_response("Conversation not found"),
                Err(err) => return store_error_response(err),
            };

            match state.store.list_messages(conversation.id).await {
                Ok(messages) => (StatusCode::OK, Json(messages)).into_response(),
                Err(err) => store_error_response(err),
            }
        }
        None => match state.store.list_conversations(user.user_id).await {
            Ok(conversations) => (StatusCode::OK, Json(conversations)).into_response(),
            Err(err) => store_error_response(err),
        },
    }
}

pub(super) async fn create_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateConversationRequest>,
) -> Response {
    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(DEFAULT_CONVERSATION_TITLE);

    match state.store.create_conversation(user.user_id, title).await {
        Ok(conversation) => (StatusCode::OK, Json(conversation)).into_response(),
        Err(err) => store_error_response(err),
    }
}
