//! Database row types, mapped directly from SQLite rows.
//! Distinct from warbler-types API models so the password hash stays in this crate.

use rusqlite::Row;

use crate::error::Result;
use crate::password;

pub const MAX_MESSAGE_LEN: usize = 140;
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

/// Column list for `users u`, in the order `UserRow::from_row` reads them.
pub(crate) const USER_COLUMNS: &str =
    "u.id, u.username, u.email, u.password, u.image_url, u.header_image_url, u.bio, u.location";

/// Column list for `messages m JOIN users u`, in the order `MessageRow::from_row` reads them.
pub(crate) const MESSAGE_COLUMNS: &str = "m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url";

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// argon2 PHC string
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            image_url: row.get(4)?,
            header_image_url: row.get(5)?,
            bio: row.get(6)?,
            location: row.get(7)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub text: String,
    /// SQLite `datetime('now')` format, UTC
    pub timestamp: String,
    pub user_id: i64,
    pub author_username: String,
    pub author_image_url: String,
}

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            timestamp: row.get(2)?,
            user_id: row.get(3)?,
            author_username: row.get(4)?,
            author_image_url: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeRow {
    pub id: i64,
    pub user_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub messages: i64,
    pub following: i64,
    pub followers: i64,
    pub likes: i64,
}

/// An account that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Already hashed. `signup` is the only constructor that accepts plaintext.
    pub password: String,
    pub image_url: Option<String>,
}

impl NewUser {
    /// Hashes `password` and builds the row to insert. Uniqueness of username
    /// and email is only checked when the row is written.
    pub fn signup(
        username: &str,
        email: &str,
        password: &str,
        image_url: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            username: username.to_string(),
            email: email.to_string(),
            password: password::hash_password(password)?,
            image_url: image_url.filter(|url| !url.is_empty()).map(str::to_string),
        })
    }
}

/// Profile edit. `None` leaves the stored value unchanged. `Some("")` clears
/// `bio` and `location`.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}
