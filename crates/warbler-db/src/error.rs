use rusqlite::ffi;
use thiserror::Error;

use crate::models::MAX_MESSAGE_LEN;

#[derive(Debug, Error)]
pub enum DbError {
    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    #[error("{field} already taken")]
    Duplicate { field: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A foreign key points at a row that does not exist.
    #[error("referenced record does not exist")]
    MissingReference,

    #[error("message text must be between 1 and {} characters", MAX_MESSAGE_LEN)]
    TextTooLong,

    #[error("users cannot like their own messages")]
    OwnMessage,

    #[error("message {0} belongs to another user")]
    NotOwner(i64),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("database lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, Some(msg)) = &err {
            match code.extended_code {
                // "UNIQUE constraint failed: users.username"
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    let field = msg
                        .rsplit(['.', ' '])
                        .next()
                        .filter(|f| !f.is_empty())
                        .unwrap_or("record")
                        .to_string();
                    return DbError::Duplicate { field };
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return DbError::MissingReference,
                ffi::SQLITE_CONSTRAINT_CHECK if msg.contains("text") => {
                    return DbError::TextTooLong;
                }
                _ => {}
            }
        }
        DbError::Sqlite(err)
    }
}
