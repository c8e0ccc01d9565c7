use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;

use warbler_types::api::HomeResponse;

use crate::AppState;
use crate::error::ApiError;
use crate::flash;
use crate::messages::message_response;
use crate::middleware::session_claims;
use crate::users::user_response;

/// Messages shown in the home feed.
const FEED_LIMIT: u32 = 100;

/// GET /: pending flash, plus the signed-in user's feed when there is a session.
pub async fn homepage(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let claims = session_claims(&headers, &jar, &state.jwt_secret);
    let (jar, pending) = flash::take(jar);

    let feed = match claims {
        Some(claims) => {
            crate::run_db(&state, move |db| {
                let Some(user) = db.get_user(claims.sub)? else {
                    return Ok(None);
                };
                let messages = db.home_feed(user.id, FEED_LIMIT)?;
                let liked = db.liked_message_ids(user.id)?;
                Ok(Some((user, messages, liked)))
            })
            .await?
        }
        None => None,
    };

    let response = match feed {
        Some((user, messages, liked)) => HomeResponse {
            flashes: pending.into_iter().map(Into::into).collect(),
            user: Some(user_response(user)),
            messages: messages
                .into_iter()
                .map(|m| {
                    let is_liked = liked.contains(&m.id);
                    message_response(m, is_liked)
                })
                .collect(),
        },
        None => HomeResponse {
            flashes: pending.into_iter().map(Into::into).collect(),
            user: None,
            messages: Vec::new(),
        },
    };

    Ok((jar, Json(response)))
}
