use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::CookieJar;
use tracing::{info, warn};
use validator::Validate;

use warbler_db::{ProfileUpdate, UserRow};
use warbler_types::api::{
    LikedMessagesResponse, ProfileEditRequest, ProfileResponse, UserListResponse, UserSearchQuery,
};
use warbler_types::models::{Account, ProfileStats, User};

use crate::AppState;
use crate::auth::end_session;
use crate::error::ApiError;
use crate::flash::{self, Flash};
use crate::messages::message_response;
use crate::middleware::CurrentUser;

/// Messages shown on a profile page.
const PROFILE_MESSAGE_LIMIT: u32 = 100;

pub fn user_response(row: UserRow) -> User {
    User {
        id: row.id,
        username: row.username,
        image_url: row.image_url,
        header_image_url: row.header_image_url,
        bio: row.bio,
        location: row.location,
    }
}

/// Only for replies addressed to the account's owner.
pub fn account_response(mut row: UserRow) -> Account {
    let email = std::mem::take(&mut row.email);
    Account {
        user: user_response(row),
        email,
    }
}

/// GET /users?q=: everyone, or usernames containing `q`.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let term = query.q.filter(|q| !q.trim().is_empty());
    let rows = crate::run_db(&state, move |db| db.search_users(term.as_deref())).await?;
    Ok(Json(rows.into_iter().map(user_response).collect::<Vec<_>>()))
}

/// GET /users/{user_id}: profile, newest messages and the four counters.
pub async fn show_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, messages, stats) = crate::run_db(&state, move |db| {
        let Some(user) = db.get_user(user_id)? else {
            return Ok(None);
        };
        let messages = db.user_messages(user_id, PROFILE_MESSAGE_LIMIT)?;
        let stats = db.user_stats(user_id)?;
        Ok(Some((user, messages, stats)))
    })
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(ProfileResponse {
        user: user_response(user),
        messages: messages
            .into_iter()
            .map(|m| message_response(m, false))
            .collect(),
        stats: ProfileStats {
            messages: stats.messages,
            following: stats.following,
            followers: stats.followers,
            likes: stats.likes,
        },
    }))
}

pub async fn show_following(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(_current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, users) = crate::run_db(&state, move |db| {
        let Some(user) = db.get_user(user_id)? else {
            return Ok(None);
        };
        Ok(Some((user, db.following(user_id)?)))
    })
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(UserListResponse {
        user: user_response(user),
        users: users.into_iter().map(user_response).collect(),
    }))
}

pub async fn show_followers(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(_current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, users) = crate::run_db(&state, move |db| {
        let Some(user) = db.get_user(user_id)? else {
            return Ok(None);
        };
        Ok(Some((user, db.followers(user_id)?)))
    })
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(UserListResponse {
        user: user_response(user),
        users: users.into_iter().map(user_response).collect(),
    }))
}

/// GET /users/{user_id}/likes: messages the user has liked. The `liked`
/// flag on each message is relative to the viewer.
pub async fn show_likes(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = current.id;
    let (user, messages, viewer_likes) = crate::run_db(&state, move |db| {
        let Some(user) = db.get_user(user_id)? else {
            return Ok(None);
        };
        let messages = db.liked_messages(user_id)?;
        let viewer_likes: HashSet<i64> = db.liked_message_ids(viewer_id)?;
        Ok(Some((user, messages, viewer_likes)))
    })
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(LikedMessagesResponse {
        user: user_response(user),
        messages: messages
            .into_iter()
            .map(|m| {
                let liked = viewer_likes.contains(&m.id);
                message_response(m, liked)
            })
            .collect(),
    }))
}

/// POST /users/follow/{follow_id}
pub async fn follow(
    State(state): State<AppState>,
    Path(follow_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Redirect, ApiError> {
    if follow_id == current.id {
        return Err(ApiError::Validation("users cannot follow themselves".into()));
    }

    let follower_id = current.id;
    let added = crate::run_db(&state, move |db| db.follow(follower_id, follow_id)).await?;
    if added {
        info!(follower_id, followed_id = follow_id, "User followed");
    }

    Ok(Redirect::to(&format!("/users/{}/following", current.id)))
}

/// POST /users/stop-following/{follow_id}
pub async fn stop_following(
    State(state): State<AppState>,
    Path(follow_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Redirect, ApiError> {
    let follower_id = current.id;
    let removed = crate::run_db(&state, move |db| db.unfollow(follower_id, follow_id)).await?;
    if removed {
        info!(follower_id, followed_id = follow_id, "User unfollowed");
    }

    Ok(Redirect::to(&format!("/users/{}/following", current.id)))
}

/// POST /users/profile: the current password must be re-entered. Replies
/// with the full account, email included.
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<ProfileEditRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let user_id = current.id;
    let updated = crate::run_db(&state, move |db| {
        let update = ProfileUpdate {
            username: req.username,
            email: req.email,
            image_url: req.image_url.filter(|s| !s.is_empty()),
            header_image_url: req.header_image_url.filter(|s| !s.is_empty()),
            bio: req.bio,
            location: req.location,
        };
        db.update_profile(user_id, &req.password, &update)
    })
    .await?;

    let Some(user) = updated else {
        warn!(user_id, "Profile edit with wrong password");
        return Err(ApiError::InvalidCredentials);
    };

    info!(user_id, "Profile updated");
    Ok(Json(account_response(user)))
}

/// POST /users/delete: removes the account and everything it owns, then
/// ends the session.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = current.id;
    crate::run_db(&state, move |db| db.delete_user(user_id)).await?;

    info!(user_id, "Account deleted: {}", current.username);
    Ok(flash::redirect(end_session(jar), Flash::AccountDeleted, "/"))
}
