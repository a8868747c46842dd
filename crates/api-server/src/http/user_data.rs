use axum::Json;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::errors::{bad_request_response, not_found_response, store_error_response};
use super::{AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub(super) struct UserDataQuery {
    #[serde(rename = "type")]
    data_type: String,
}

/// Read-only projections of the caller's stored data.
pub(super) async fn get_user_data(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<UserDataQuery>,
) -> Response {
    match query.data_type.as_str() {
        "profile" => match state.store.get_profile(user.user_id).await {
            Ok(Some(profile)) => (StatusCode::OK, Json(profile)).into_response(),
            Ok(None) => not_found_response("Profile not found"),
            Err(err) => store_error_response(err),
        },
        "memory" => match state.store.get_user_memory(user.user_id).await {
            Ok(Some(memory)) => (StatusCode::OK, Json(memory)).into_response(),
            Ok(None) => not_found_response("No memory recorded yet"),
            Err(err) => store_error_response(err),
        },
        "documents" => match state.store.list_recent_documents(user.user_id).await {
            Ok(documents) => (StatusCode::OK, Json(documents)).into_response(),
            Err(err) => store_error_response(err),
        },
        _ => bad_request_response("Invalid data type requested"),
    }
}
