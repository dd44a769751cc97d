//! Authentication middleware
//!
//! Verifies the bearer token issued by the identity service and attaches the caller's
//! user id to the request. Every farm route is scoped to that id.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|header| header.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return unauthorized("Missing or invalid Authorization header"),
    };

    let user_id = match verify_token(token, &state.config.jwt.secret) {
        Ok(user_id) => user_id,
        Err(msg) => return unauthorized(&msg),
    };

    request.extensions_mut().insert(AuthUser { user_id });

    next.run(request).await
}

/// Decode a token and return the user id in its subject
pub fn verify_token(token: &str, secret: &str) -> Result<Uuid, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))?;

    Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token".to_string())
}

fn unauthorized(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}
