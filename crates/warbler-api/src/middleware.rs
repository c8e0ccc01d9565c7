use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use warbler_types::api::Claims;

use crate::AppState;
use crate::error::ApiError;

/// Session cookie holding the signed-in user's token.
pub const CURR_USER_KEY: &str = "curr_user";

/// The signed-in user, inserted as a request extension by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Reads the session from the `Authorization: Bearer` header, falling back
/// to the session cookie. Expired or forged tokens count as no session.
pub fn session_claims(headers: &HeaderMap, jar: &CookieJar, secret: &str) -> Option<Claims> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let token = match bearer {
        Some(token) => token,
        None => jar.get(CURR_USER_KEY)?.value(),
    };

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| debug!("Rejected session token: {}", e))
    .ok()
    .map(|data| data.claims)
}

/// Rejects requests without a live session. The token must decode and its
/// user must still exist.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(req.headers());
    let claims =
        session_claims(req.headers(), &jar, &state.jwt_secret).ok_or(ApiError::Unauthorized)?;

    let user = crate::run_db(&state, move |db| db.get_user(claims.sub))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
    });
    Ok(next.run(req).await)
}
