use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;
use uuid::Uuid;

use super::errors::{internal_error_response, store_error_response, unauthorized_response};
use super::identity::{IdentityError, verify_identity_token};
use super::{AppState, AuthUser};

const AUTH_SUBJECT_NAMESPACE: Uuid = Uuid::from_u128(0x7c2f1a6e84d94b1f93a05cf6de20b741);

pub(super) async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let Some(token) = token else {
        warn!("missing or invalid authorization header");
        return unauthorized_response();
    };

    let identity = match verify_identity_token(
        &state.http_client,
        &state.jwks_cache,
        &state.auth.jwks_url,
        &state.auth.issuer,
        &state.auth.audience,
        token,
    )
    .await
    {
        Ok(identity) => identity,
        Err(IdentityError::InvalidToken { message }) => {
            warn!("bearer token rejected: {message}");
            return unauthorized_response();
        }
        Err(IdentityError::UpstreamUnavailable { message }) => {
            warn!("identity provider unavailable: {message}");
            return internal_error_response("Unable to verify identity");
        }
    };

    let user_id = user_id_for_subject(&state.auth.issuer, &identity.subject);
    match state.store.ensure_profile(user_id).await {
        Ok(()) => {}
        Err(err) => return store_error_response(err),
    }

    req.extensions_mut().insert(AuthUser { user_id });
    next.run(req).await
}

// Token subjects are provider-scoped strings; requests map them to a stable
// internal id so the same subject always resolves to the same user.
fn user_id_for_subject(issuer: &str, subject: &str) -> Uuid {
    let stable_subject = format!("{}:{subject}", issuer.trim_end_matches('/'));
    Uuid::new_v5(&AUTH_SUBJECT_NAMESPACE, stable_subject.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::user_id_for_subject;

    #[test]
    fn subject_mapping_is_stable_and_issuer_scoped() {
        let a = user_id_for_subject("https://id.example.com/", "user-1");
        let b = user_id_for_subject("https://id.example.com", "user-1");
        let other_issuer = user_id_for_subject("https://other.example.com", "user-1");
        let other_subject = user_id_for_subject("https://id.example.com", "user-2");

        assert_eq!(a, b, "trailing slash must not change the mapping");
        assert_ne!(a, other_issuer);
        assert_ne!(a, other_subject);
    }
}
