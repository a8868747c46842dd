use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::llm::{
    ChatCompletionRequest, ChatMessage, MessageContent, Role, compose_tutor_prompt,
    extract_visual_prompts, generate_images,
};
use shared::models::{ChatRequest, ChatResponse, TurnRole};
use tracing::warn;

use super::errors::{
    bad_request_response, gateway_error_response, not_found_response, store_error_response,
};
use super::{AppState, AuthUser};

pub(super) async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let message = req.message.trim();
    if message.is_empty() {
        return bad_request_response("message is required");
    }

    let conversation = match state
        .store
        .get_conversation(req.conversation_id, user.user_id)
        .await
    {
        Ok(Some(conversation)) => conversation,
        Ok(None) => return not_found_response("Conversation not found"),
        Err(err) => return store_error_response(err),
    };

    // Personalization is best-effort: an unreadable memory record degrades to
    // the default profile instead of failing the lesson.
    let memory = match state.store.get_user_memory(user.user_id).await {
        Ok(memory) => memory,
        Err(err) => {
            warn!(user_id = %user.user_id, "failed to load user memory: {err}");
            None
        }
    };

    let history = match state
        .store
        .recent_messages(conversation.id, state.context_turns)
        .await
    {
        Ok(history) => history,
        Err(err) => return store_error_response(err),
    };

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(compose_tutor_prompt(memory.as_ref())));
    for turn in &history {
        messages.push(match turn.role {
            TurnRole::User => ChatMessage::user(turn.content.clone()),
            TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
        });
    }
    messages.push(build_user_turn(
        message,
        req.file_content.as_deref(),
        req.file_type.as_deref(),
    ));

    let raw_reply = match state
        .chat_gateway
        .complete(ChatCompletionRequest {
            model: state.chat_model.clone(),
            messages,
        })
        .await
    {
        Ok(reply) => reply,
        Err(err) => return gateway_error_response(err),
    };

    let (content, visual_prompts) = extract_visual_prompts(&raw_reply);

    let images: Vec<String> = match &state.image_gateway {
        Some(gateway) => generate_images(
            gateway.as_ref(),
            &visual_prompts,
            state.max_images_per_reply,
        )
        .await
        .into_iter()
        .flatten()
        .collect(),
        None => Vec::new(),
    };

    // The user turn is written before the assistant turn. A failure after the
    // user write leaves a dangling user turn; that is accepted for a learning
    // log (no rollback).
    if let Err(err) = state
        .store
        .append_message(conversation.id, TurnRole::User, message, &[], &[])
        .await
    {
        return store_error_response(err);
    }

    if let Err(err) = state
        .store
        .append_message(
            conversation.id,
            TurnRole::Assistant,
            &content,
            &images,
            &visual_prompts,
        )
        .await
    {
        return store_error_response(err);
    }

    if let Err(err) = state.store.touch_user_memory(user.user_id).await {
        warn!(user_id = %user.user_id, "failed to touch user memory: {err}");
    }

    if let (Some(file_name), Some(file_type)) = (req.file_name.as_deref(), req.file_type.as_deref())
        && let Err(err) = state
            .store
            .record_document(user.user_id, file_name, file_type)
            .await
    {
        warn!(user_id = %user.user_id, "failed to record uploaded document: {err}");
    }

    (
        StatusCode::OK,
        Json(ChatResponse {
            content,
            images,
            visual_prompts,
        }),
    )
        .into_response()
}

/// Builds the final user turn. Image uploads ride along as a vision content
/// part; any other file type is appended to the message text.
fn build_user_turn(
    message: &str,
    file_content: Option<&str>,
    file_type: Option<&str>,
) -> ChatMessage {
    match (file_content, file_type) {
        (Some(file_content), Some(file_type)) if file_type.starts_with("image/") => ChatMessage {
            role: Role::User,
            content: MessageContent::text_with_image(message, file_content),
        },
        (Some(file_content), Some(_)) => {
            ChatMessage::user(format!("{message}\n\nFile content:\n{file_content}"))
        }
        _ => ChatMessage::user(message),
    }
}

#[cfg(test)]
mod tests {
    use shared::llm::{ContentPart, MessageContent};

    use super::build_user_turn;

    #[test]
    fn image_files_become_vision_parts() {
        let turn = build_user_turn(
            "what is this?",
            Some("data:image/png;base64,AAAA"),
            Some("image/png"),
        );

        let MessageContent::Parts(parts) = turn.content else {
            panic!("image upload should produce mixed content");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], ContentPart::Text { text } if text == "what is this?"));
        assert!(matches!(
            &parts[1],
            ContentPart::ImageUrl { image_url } if image_url.url == "data:image/png;base64,AAAA"
        ));
    }

    #[test]
    fn text_files_are_appended_to_the_message() {
        let turn = build_user_turn("summarize this", Some("chapter one..."), Some("text/plain"));

        let MessageContent::Text(text) = turn.content else {
            panic!("text upload should stay plain text");
        };
        assert_eq!(text, "summarize this\n\nFile content:\nchapter one...");
    }

    #[test]
    fn no_file_keeps_the_plain_message() {
        let turn = build_user_turn("explain photosynthesis", None, None);

        let MessageContent::Text(text) = turn.content else {
            panic!("plain message expected");
        };
        assert_eq!(text, "explain photosynthesis");
    }
}
