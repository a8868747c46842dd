use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use shared::llm::{
    ChatCompletionRequest, ChatMessage, compose_transcript_lesson_prompt, extract_visual_prompts,
    generate_images, transcript_user_message,
};
use shared::models::{
    LessonPayload, TranscribeRequest, TranscribeResponse, TranscriptCacheEntry, TurnRole,
};
use shared::transcripts::flatten_transcript_text;
use shared::youtube::extract_video_id;
use tracing::{info, warn};

use super::errors::{
    bad_request_response, gateway_error_response, not_found_response, store_error_response,
    transcript_error_response,
};
use super::{AppState, AuthUser};

const PROVIDER_SOURCE: &str = "rapidapi";
const CACHE_SOURCE: &str = "cache";

pub(super) async fn transcribe_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<TranscribeRequest>,
) -> Response {
    if req.video_url.trim().is_empty() {
        return bad_request_response("videoUrl is required");
    }

    let Some(video_id) = extract_video_id(&req.video_url) else {
        return bad_request_response("Invalid YouTube URL");
    };

    let now = Utc::now();
    let cached_entry = match state.store.get_transcript(&video_id).await {
        Ok(entry) => entry,
        Err(err) => return store_error_response(err),
    };

    // Expired entries never serve stale content: a dead provider fails the
    // request even when an old transcript is still on disk.
    let (transcript, source, cached) = match cached_entry {
        Some(entry) if entry.is_valid_at(now) => {
            info!(video_id = %video_id, "serving cached transcript");
            (entry.transcript, CACHE_SOURCE, true)
        }
        _ => {
            let payload = match state.transcript_client.fetch(&video_id).await {
                Ok(payload) => payload,
                Err(err) => return transcript_error_response(err),
            };

            let entry = TranscriptCacheEntry {
                video_id: video_id.clone(),
                video_url: req.video_url.clone(),
                transcript: payload.clone(),
                source: PROVIDER_SOURCE.to_string(),
                fetched_at: now,
                expires_at: now + Duration::days(state.transcript_client.cache_ttl_days()),
                created_by: user.user_id,
            };
            if let Err(err) = state.store.upsert_transcript(&entry).await {
                return store_error_response(err);
            }

            (payload, PROVIDER_SOURCE, false)
        }
    };

    let memory = match state.store.get_user_memory(user.user_id).await {
        Ok(memory) => memory,
        Err(err) => {
            warn!(user_id = %user.user_id, "failed to load user memory: {err}");
            None
        }
    };

    let transcript_text = flatten_transcript_text(&transcript);
    let messages = vec![
        ChatMessage::system(compose_transcript_lesson_prompt(memory.as_ref())),
        ChatMessage::user(transcript_user_message(&transcript_text)),
    ];

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

    if let Some(conversation_id) = req.conversation_id {
        let conversation = match state
            .store
            .get_conversation(conversation_id, user.user_id)
            .await
        {
            Ok(Some(conversation)) => conversation,
            Ok(None) => return not_found_response("Conversation not found"),
            Err(err) => return store_error_response(err),
        };

        if let Err(err) = state
            .store
            .append_message(conversation.id, TurnRole::User, &req.video_url, &[], &[])
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
    }

    if let Err(err) = state.store.touch_user_memory(user.user_id).await {
        warn!(user_id = %user.user_id, "failed to touch user memory: {err}");
    }

    (
        StatusCode::OK,
        Json(TranscribeResponse {
            video_id,
            video_url: req.video_url,
            transcript,
            lesson: LessonPayload {
                content,
                visual_prompts,
                images,
            },
            source: source.to_string(),
            cached,
        }),
    )
        .into_response()
}
