use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Account, Message, ProfileStats, User};

// -- Session --

/// JWT claims carried by the session cookie and the bearer header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 30))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Account,
    pub token: String,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchQuery {
    pub q: Option<String>,
}

/// Profile edit form. Omitted optional fields keep their current value. An
/// empty `bio` or `location` clears it.
/// The current password must be supplied to authorise the change.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProfileEditRequest {
    #[validate(length(min = 1, max = 30))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub header_image_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: User,
    pub messages: Vec<Message>,
    pub stats: ProfileStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub user: User,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikedMessagesResponse {
    pub user: User,
    pub messages: Vec<Message>,
}

// -- Messages --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewMessageRequest {
    #[validate(length(min = 1, max = 140))]
    pub text: String,
}

// -- Home --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashMessage {
    pub category: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub flashes: Vec<FlashMessage>,
    pub user: Option<User>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
