use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use validator::Validate;

use warbler_db::NewUser;
use warbler_types::api::{Claims, LoginRequest, SessionResponse, SignupRequest};

use crate::AppState;
use crate::error::ApiError;
use crate::flash::{self, Flash};
use crate::middleware::CURR_USER_KEY;
use crate::users::account_response;

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    // Argon2 hashing is CPU-bound, keep it off the async threads with the insert.
    let user = crate::run_db(&state, move |db| {
        let new_user = NewUser::signup(
            &req.username,
            &req.email,
            &req.password,
            req.image_url.as_deref(),
        )?;
        db.insert_user(&new_user)
    })
    .await?;

    info!(user_id = user.id, "New user signed up: {}", user.username);

    let token = create_token(&state.jwt_secret, user.id, &user.username, state.session_days)?;

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token.clone())),
        Json(SessionResponse {
            user: account_response(user),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let user = crate::run_db(&state, move |db| db.authenticate(&req.username, &req.password))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    info!(user_id = user.id, "User logged in: {}", user.username);

    let token = create_token(&state.jwt_secret, user.id, &user.username, state.session_days)?;

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(SessionResponse {
            user: account_response(user),
            token,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    flash::redirect(end_session(jar), Flash::LoggedOut, "/")
}

pub(crate) fn end_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(CURR_USER_KEY).path("/"))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((CURR_USER_KEY, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn create_token(
    secret: &str,
    user_id: i64,
    username: &str,
    session_days: i64,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(session_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
