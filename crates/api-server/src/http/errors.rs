use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::llm::ChatGatewayError;
use shared::models::ErrorResponse;
use shared::repos::StoreError;
use shared::transcripts::TranscriptError;
use tracing::error;

pub(super) fn bad_request_response(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub(super) fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Missing or invalid bearer token".to_string(),
        }),
    )
        .into_response()
}

pub(super) fn not_found_response(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub(super) fn internal_error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub(super) fn store_error_response(err: StoreError) -> Response {
    error!("database operation failed: {err}");
    internal_error_response("Unexpected server error")
}

/// Rate-limit and quota exhaustion keep their own statuses and copy; every
/// other provider failure collapses to a generic 500.
pub(super) fn gateway_error_response(err: ChatGatewayError) -> Response {
    match err {
        ChatGatewayError::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "Rate limit exceeded. Please try again in a moment.".to_string(),
            }),
        )
            .into_response(),
        ChatGatewayError::QuotaExceeded => (
            StatusCode::PAYMENT_REQUIRED,
            Json(ErrorResponse {
                error: "AI usage limit reached. Please add credits to continue.".to_string(),
            }),
        )
            .into_response(),
        other => {
            error!("chat provider request failed: {other}");
            internal_error_response("Failed to get AI response")
        }
    }
}

pub(super) fn transcript_error_response(err: TranscriptError) -> Response {
    error!("transcript fetch failed: {err}");
    match err {
        TranscriptError::EmptyTranscript => {
            internal_error_response("Transcript is empty or invalid")
        }
        _ => internal_error_response("Failed to fetch video transcript"),
    }
}
