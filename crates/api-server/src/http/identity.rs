use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;

use super::jwks_cache::{Jwks, JwksCache, JwksCacheError};

const MAX_CLOCK_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone)]
pub(super) struct VerifiedIdentity {
    pub(super) subject: String,
}

#[derive(Debug, Clone)]
pub(super) enum IdentityError {
    InvalidToken { message: &'static str },
    UpstreamUnavailable { message: &'static str },
}

#[derive(Debug, Deserialize)]
struct IdentityClaims {
    sub: String,
    iat: i64,
}

pub(super) async fn verify_identity_token(
    http_client: &reqwest::Client,
    jwks_cache: &JwksCache,
    jwks_url: &str,
    expected_issuer: &str,
    expected_audience: &str,
    identity_token: &str,
) -> Result<VerifiedIdentity, IdentityError> {
    if identity_token.trim().is_empty() {
        return Err(IdentityError::InvalidToken {
            message: "Bearer token is required",
        });
    }

    let header = decode_header(identity_token).map_err(|_| IdentityError::InvalidToken {
        message: "Bearer token is malformed",
    })?;

    if header.alg != Algorithm::RS256 {
        return Err(IdentityError::InvalidToken {
            message: "Bearer token algorithm is unsupported",
        });
    }

    let Some(key_id) = header.kid else {
        return Err(IdentityError::InvalidToken {
            message: "Bearer token key id is missing",
        });
    };

    let jwks = jwks_cache
        .load_for_key(http_client, jwks_url, &key_id)
        .await
        .map_err(|err| match err {
            JwksCacheError::UnknownKeyId => IdentityError::InvalidToken {
                message: "Bearer token key was not recognized",
            },
            JwksCacheError::UpstreamUnavailable => IdentityError::UpstreamUnavailable {
                message: "Identity provider keys are unavailable",
            },
        })?;

    verify_token_with_jwks(
        identity_token,
        expected_issuer,
        expected_audience,
        &key_id,
        &jwks,
    )
}

fn verify_token_with_jwks(
    identity_token: &str,
    expected_issuer: &str,
    expected_audience: &str,
    key_id: &str,
    jwks: &Jwks,
) -> Result<VerifiedIdentity, IdentityError> {
    let Some(jwk) = jwks.keys.iter().find(|key| {
        key.kid == key_id && key.kty == "RSA" && matches!(key.use_.as_deref(), None | Some("sig"))
    }) else {
        return Err(IdentityError::InvalidToken {
            message: "Bearer token key was not recognized",
        });
    };

    if jwk.alg.as_deref().unwrap_or("RS256") != "RS256" {
        return Err(IdentityError::InvalidToken {
            message: "Bearer token key algorithm is unsupported",
        });
    }

    let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(|_| {
        IdentityError::InvalidToken {
            message: "Bearer token key was invalid",
        }
    })?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[expected_audience]);
    validation.set_issuer(&[expected_issuer]);
    validation.leeway = MAX_CLOCK_SKEW_SECONDS as u64;
    validation.required_spec_claims = ["exp", "iat", "iss", "aud", "sub"]
        .into_iter()
        .map(str::to_string)
        .collect();

    let token_data = decode::<IdentityClaims>(identity_token, &decoding_key, &validation)
        .map_err(|err| {
            let message = match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Bearer token is expired",
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    "Bearer token audience does not match"
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => "Bearer token issuer is invalid",
                _ => "Bearer token validation failed",
            };
            IdentityError::InvalidToken { message }
        })?;

    let now = Utc::now().timestamp();
    if token_data.claims.iat > now + MAX_CLOCK_SKEW_SECONDS {
        return Err(IdentityError::InvalidToken {
            message: "Bearer token issue time is invalid",
        });
    }

    let subject = token_data.claims.sub.trim();
    if subject.is_empty() {
        return Err(IdentityError::InvalidToken {
            message: "Bearer token subject is missing",
        });
    }

    Ok(VerifiedIdentity {
        subject: subject.to_string(),
    })
}
