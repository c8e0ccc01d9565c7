use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use tracing::{info, warn};
use validator::Validate;

use warbler_db::MessageRow;
use warbler_types::api::NewMessageRequest;
use warbler_types::models::Message;

use crate::AppState;
use crate::error::ApiError;
use crate::flash::{self, Flash};
use crate::middleware::CurrentUser;

pub fn message_response(row: MessageRow, liked: bool) -> Message {
    let timestamp = row
        .timestamp
        .parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(&row.timestamp, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on message '{}': {}", row.timestamp, row.id, e);
            chrono::DateTime::default()
        });

    Message {
        id: row.id,
        text: row.text,
        timestamp,
        user_id: row.user_id,
        username: row.author_username,
        image_url: row.author_image_url,
        liked,
    }
}

/// POST /messages/new
pub async fn new_message(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<NewMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let user_id = current.id;
    let row = crate::run_db(&state, move |db| db.insert_message(user_id, &req.text)).await?;

    info!(user_id, message_id = row.id, "Message posted");
    Ok((StatusCode::CREATED, Json(message_response(row, false))))
}

/// GET /messages/{message_id}
pub async fn show_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let row = crate::run_db(&state, move |db| db.get_message(message_id))
        .await?
        .ok_or(ApiError::NotFound("message"))?;

    Ok(Json(message_response(row, false)))
}

/// POST /messages/{message_id}/delete: owner only. Anyone else is
/// turned away as unauthorized and the message stays.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = current.id;
    crate::run_db(&state, move |db| db.delete_message(message_id, user_id)).await?;

    info!(user_id, message_id, "Message deleted");
    Ok(flash::redirect(
        jar,
        Flash::MessageDeleted,
        &format!("/users/{}", current.id),
    ))
}
