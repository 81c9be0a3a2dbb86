//! Bearer-JWT validation and CORS for the API surface.

use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::app::AppState;

/// Verification inputs shared by every request.
#[derive(Debug, Clone)]
pub(crate) struct AuthConfig {
    pub(crate) jwt_secret: String,
    pub(crate) issuer: String,
}

/// The caller extracted from a valid token, stored in request extensions.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AuthenticatedUser(pub(crate) Uuid);

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    iss: String,
    #[allow(dead_code)]
    exp: i64,
}

pub(crate) fn validate_token(config: &AuthConfig, token: &str) -> Option<Uuid> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[config.issuer.as_str()]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .ok()?;

    if data.claims.sub.is_empty() {
        return None;
    }

    Uuid::parse_str(&data.claims.sub).ok()
}

/// Reject the request unless it carries a valid HS256 bearer token issued by
/// the configured auth server.
pub(crate) async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id = validate_token(state.auth(), token).ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(AuthenticatedUser(user_id));
    Ok(next.run(request).await)
}

pub(crate) fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
