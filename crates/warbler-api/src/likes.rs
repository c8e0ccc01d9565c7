use axum::{
    Extension,
    extract::{Path, State},
    response::Redirect,
};
use tracing::info;

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// POST /messages/{message_id}/like: likes the message, or unlikes it if
/// already liked. Liking one's own message is forbidden.
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Redirect, ApiError> {
    let user_id = current.id;
    let added = crate::run_db(&state, move |db| db.toggle_like(user_id, message_id)).await?;

    if added {
        info!(user_id, message_id, "Like added");
    } else {
        info!(user_id, message_id, "Like removed");
    }

    Ok(Redirect::to("/"))
}
