use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::Database;
use crate::error::{DbError, Result};
use crate::models::{
    DEFAULT_IMAGE_URL, LikeRow, MAX_MESSAGE_LEN, MESSAGE_COLUMNS, MessageRow, NewUser,
    ProfileUpdate, USER_COLUMNS, UserRow, UserStats,
};
use crate::password;

impl Database {
    // -- Users --

    /// Inserts a signed-up user. Duplicate username or email rolls back and
    /// surfaces as `DbError::Duplicate`.
    pub fn insert_user(&self, user: &NewUser) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password, image_url)
                 VALUES (?1, ?2, ?3, COALESCE(?4, ?5))",
                params![
                    user.username,
                    user.email,
                    user.password,
                    user.image_url,
                    DEFAULT_IMAGE_URL
                ],
            )?;
            let id = conn.last_insert_rowid();
            require_user(conn, id)
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    /// Returns the user when `password` matches the stored hash. An unknown
    /// username and a wrong password both give `None`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserRow>> {
        let user = self.get_user_by_username(username)?;
        Ok(user.filter(|u| password::verify_password(password, &u.password)))
    }

    /// All users, or those whose username contains `term`. Case is folded
    /// for any script, not just ASCII.
    pub fn search_users(&self, term: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| match term {
            Some(term) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {USER_COLUMNS} FROM users u
                     WHERE instr(fold_case(u.username), fold_case(?1)) > 0
                     ORDER BY u.id"
                ))?;
                let rows = stmt
                    .query_map([term], UserRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.id"))?;
                let rows = stmt
                    .query_map([], UserRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
        })
    }

    /// Applies `update` if `password` matches the user's current one. The
    /// check and the write share one transaction. `None` means the password
    /// was wrong and nothing changed.
    pub fn update_profile(
        &self,
        id: i64,
        password: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            let user = require_user(conn, id)?;
            if !password::verify_password(password, &user.password) {
                return Ok(None);
            }
            conn.execute(
                "UPDATE users SET
                    username = ?2,
                    email = ?3,
                    image_url = COALESCE(?4, image_url),
                    header_image_url = COALESCE(?5, header_image_url),
                    bio = CASE WHEN ?6 IS NULL THEN bio ELSE NULLIF(?6, '') END,
                    location = CASE WHEN ?7 IS NULL THEN location ELSE NULLIF(?7, '') END
                 WHERE id = ?1",
                params![
                    id,
                    update.username,
                    update.email,
                    update.image_url,
                    update.header_image_url,
                    update.bio,
                    update.location
                ],
            )?;
            require_user(conn, id).map(Some)
        })
    }

    /// Deletes the user together with their messages, follows and likes.
    pub fn delete_user(&self, id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(DbError::NotFound { entity: "user", id });
            }
            Ok(())
        })
    }

    pub fn user_stats(&self, id: i64) -> Result<UserStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM messages WHERE user_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE user_following_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1),
                    (SELECT COUNT(*) FROM likes WHERE user_id = ?1)",
                [id],
                |row| {
                    Ok(UserStats {
                        messages: row.get(0)?,
                        following: row.get(1)?,
                        followers: row.get(2)?,
                        likes: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    // -- Follows --

    /// `follower_id` starts following `followed_id`. Returns false when the
    /// edge already existed.
    pub fn follow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            require_user(conn, followed_id)?;
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (user_being_followed_id, user_following_id)
                 VALUES (?1, ?2)",
                [followed_id, follower_id],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Returns false when there was no edge to remove.
    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM follows
                 WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                [followed_id, follower_id],
            )?;
            Ok(deleted == 1)
        })
    }

    /// Does `user_id` follow `other_id`?
    pub fn is_following(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.with_conn(|conn| follow_exists(conn, user_id, other_id))
    }

    /// Is `user_id` followed by `other_id`?
    pub fn is_followed_by(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.with_conn(|conn| follow_exists(conn, other_id, user_id))
    }

    /// Users that `user_id` follows.
    pub fn following(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users u
                 JOIN follows f ON f.user_being_followed_id = u.id
                 WHERE f.user_following_id = ?1
                 ORDER BY u.id"
            ))?;
            let rows = stmt
                .query_map([user_id], UserRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users that follow `user_id`.
    pub fn followers(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users u
                 JOIN follows f ON f.user_following_id = u.id
                 WHERE f.user_being_followed_id = ?1
                 ORDER BY u.id"
            ))?;
            let rows = stmt
                .query_map([user_id], UserRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, user_id: i64, text: &str) -> Result<MessageRow> {
        let len = text.chars().count();
        if len == 0 || len > MAX_MESSAGE_LEN {
            return Err(DbError::TextTooLong);
        }

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (text, user_id) VALUES (?1, ?2)",
                params![text, user_id],
            )?;
            let id = conn.last_insert_rowid();
            query_message(conn, id)?.ok_or(DbError::NotFound { entity: "message", id })
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Deletes a message on behalf of `owner_id`. Anyone else gets `NotOwner`.
    pub fn delete_message(&self, id: i64, owner_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let author = message_author(conn, id)?;
            if author != owner_id {
                return Err(DbError::NotOwner(id));
            }
            conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Newest first.
    pub fn user_messages(&self, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.user_id = ?1
                 ORDER BY m.timestamp DESC, m.id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![user_id, limit], MessageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Messages written by `user_id` or by anyone they follow, newest first.
    pub fn home_feed(&self, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.user_id = ?1
                    OR m.user_id IN (
                        SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1
                    )
                 ORDER BY m.timestamp DESC, m.id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![user_id, limit], MessageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Likes --

    /// Records that `user_id` likes `message_id`. A second like of the same
    /// message is rejected as `Duplicate`.
    pub fn add_like(&self, user_id: i64, message_id: i64) -> Result<LikeRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                [user_id, message_id],
            )?;
            Ok(LikeRow {
                id: conn.last_insert_rowid(),
                user_id,
                message_id,
            })
        })
    }

    /// Toggle a like: removes it if present, inserts it if not.
    /// Returns true when the like was added. Liking one's own message is refused.
    pub fn toggle_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let author = message_author(conn, message_id)?;
            if author == user_id {
                return Err(DbError::OwnMessage);
            }

            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM likes WHERE user_id = ?1 AND message_id = ?2",
                    [user_id, message_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(like_id) = existing {
                conn.execute("DELETE FROM likes WHERE id = ?1", [like_id])?;
                debug!(user_id, message_id, "like removed");
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                    [user_id, message_id],
                )?;
                debug!(user_id, message_id, "like added");
                Ok(true)
            }
        })
    }

    pub fn likes_for_message(&self, message_id: i64) -> Result<Vec<LikeRow>> {
        self.with_conn(|conn| query_likes(conn, "message_id", message_id))
    }

    pub fn likes_for_user(&self, user_id: i64) -> Result<Vec<LikeRow>> {
        self.with_conn(|conn| query_likes(conn, "user_id", user_id))
    }

    pub fn count_likes(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM likes", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    /// Messages liked by `user_id`, most recently liked first.
    pub fn liked_messages(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM likes l
                 JOIN messages m ON m.id = l.message_id
                 JOIN users u ON u.id = m.user_id
                 WHERE l.user_id = ?1
                 ORDER BY l.id DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], MessageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn liked_message_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT message_id FROM likes WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            Ok(ids)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
            [id],
            UserRow::from_row,
        )
        .optional()?;
    Ok(row)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"),
            [username],
            UserRow::from_row,
        )
        .optional()?;
    Ok(row)
}

fn require_user(conn: &Connection, id: i64) -> Result<UserRow> {
    query_user_by_id(conn, id)?.ok_or(DbError::NotFound { entity: "user", id })
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.id = ?1"
            ),
            [id],
            MessageRow::from_row,
        )
        .optional()?;
    Ok(row)
}

fn message_author(conn: &Connection, message_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT user_id FROM messages WHERE id = ?1",
        [message_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(DbError::NotFound {
        entity: "message",
        id: message_id,
    })
}

fn follow_exists(conn: &Connection, follower_id: i64, followed_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM follows
            WHERE user_being_followed_id = ?1 AND user_following_id = ?2
         )",
        [followed_id, follower_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// `column` is always a literal from this module, never user input.
fn query_likes(conn: &Connection, column: &str, id: i64) -> Result<Vec<LikeRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, user_id, message_id FROM likes WHERE {column} = ?1 ORDER BY id"
    ))?;
    let rows = stmt
        .query_map([id], |row| {
            Ok(LikeRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                message_id: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn signup(db: &Database, username: &str, email: &str) -> UserRow {
        let user = NewUser::signup(username, email, "password", None).unwrap();
        db.insert_user(&user).unwrap()
    }

    fn ids(rows: &[UserRow]) -> Vec<i64> {
        rows.iter().map(|u| u.id).collect()
    }

    // -- Users --

    #[test]
    fn new_user_has_no_messages_or_followers() {
        let db = db();
        let user = db
            .insert_user(&NewUser {
                username: "testuser".into(),
                email: "test@test.com".into(),
                password: "HASHED_PASSWORD".into(),
                image_url: None,
            })
            .unwrap();

        assert!(db.user_messages(user.id, 100).unwrap().is_empty());
        assert!(db.followers(user.id).unwrap().is_empty());
        assert_eq!(db.user_stats(user.id).unwrap(), UserStats::default());
        assert_eq!(user.image_url, DEFAULT_IMAGE_URL);
    }

    #[test]
    fn signup_stores_hash_not_plaintext() {
        let db = db();
        let user = signup(&db, "testermctest", "mctest@tester.com");

        let stored = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(stored.username, "testermctest");
        assert_eq!(stored.email, "mctest@tester.com");
        assert_ne!(stored.password, "password");
        assert!(stored.password.starts_with("$argon2id$"));
    }

    #[test]
    fn signup_keeps_custom_image() {
        let db = db();
        let user = db
            .insert_user(&NewUser::signup("pic", "pic@test.com", "password", Some("/me.png")).unwrap())
            .unwrap();
        assert_eq!(user.image_url, "/me.png");
    }

    #[test]
    fn duplicate_username_is_rejected_and_rolled_back() {
        let db = db();
        signup(&db, "test1", "email1@email.com");

        let dup = NewUser::signup("test1", "other@email.com", "password", None).unwrap();
        let err = db.insert_user(&dup).unwrap_err();
        assert!(matches!(err, DbError::Duplicate { ref field } if field == "username"));
        assert_eq!(db.search_users(None).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = db();
        signup(&db, "test1", "email1@email.com");

        let dup = NewUser::signup("test2", "email1@email.com", "password", None).unwrap();
        let err = db.insert_user(&dup).unwrap_err();
        assert!(matches!(err, DbError::Duplicate { ref field } if field == "email"));
    }

    #[test]
    fn authenticate_checks_password() {
        let db = db();
        let user = signup(&db, "test1", "email1@email.com");

        let found = db.authenticate("test1", "password").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(db.authenticate("test1", "wrong-password").unwrap().is_none());
        assert!(db.authenticate("nobody", "password").unwrap().is_none());
    }

    #[test]
    fn search_matches_username_substring() {
        let db = db();
        signup(&db, "testuser", "a@test.com");
        signup(&db, "135", "b@test.com");
        signup(&db, "TesterUser", "c@test.com");

        let names: Vec<String> = db
            .search_users(Some("test"))
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["testuser", "TesterUser"]);

        assert_eq!(db.search_users(None).unwrap().len(), 3);
        assert!(db.search_users(Some("%")).unwrap().is_empty());
    }

    #[test]
    fn search_folds_case_beyond_ascii() {
        let db = db();
        let emile = signup(&db, "Émile", "emile@test.com");
        signup(&db, "emil", "emil@test.com");

        assert_eq!(ids(&db.search_users(Some("émile")).unwrap()), vec![emile.id]);
        assert_eq!(ids(&db.search_users(Some("ÉMILE")).unwrap()), vec![emile.id]);
        assert_eq!(db.search_users(Some("EMIL")).unwrap().len(), 1);
    }

    #[test]
    fn update_profile_keeps_omitted_fields() {
        let db = db();
        let user = signup(&db, "test1", "email1@email.com");

        let updated = db
            .update_profile(
                user.id,
                "password",
                &ProfileUpdate {
                    username: "renamed".into(),
                    email: "new@email.com".into(),
                    bio: Some("hello".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.email, "new@email.com");
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        assert_eq!(updated.image_url, user.image_url);
        assert_eq!(updated.password, user.password);
    }

    #[test]
    fn update_profile_rejects_taken_username() {
        let db = db();
        let user = signup(&db, "test1", "email1@email.com");
        signup(&db, "test2", "email2@email.com");

        let err = db
            .update_profile(
                user.id,
                "password",
                &ProfileUpdate {
                    username: "test2".into(),
                    email: "email1@email.com".into(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DbError::Duplicate { .. }));
        assert_eq!(db.get_user(user.id).unwrap().unwrap().username, "test1");
    }

    #[test]
    fn update_profile_with_wrong_password_changes_nothing() {
        let db = db();
        let user = signup(&db, "test1", "email1@email.com");

        let update = ProfileUpdate {
            username: "renamed".into(),
            email: "new@email.com".into(),
            ..Default::default()
        };
        assert!(db.update_profile(user.id, "wrong-password", &update).unwrap().is_none());

        let stored = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(stored.username, "test1");
        assert_eq!(stored.email, "email1@email.com");
    }

    #[test]
    fn update_profile_clears_bio_and_location_with_empty_text() {
        let db = db();
        let user = signup(&db, "test1", "email1@email.com");
        let mut update = ProfileUpdate {
            username: "test1".into(),
            email: "email1@email.com".into(),
            bio: Some("hello".into()),
            location: Some("Nest".into()),
            ..Default::default()
        };
        db.update_profile(user.id, "password", &update).unwrap().unwrap();

        update.bio = None;
        update.location = Some(String::new());
        let updated = db.update_profile(user.id, "password", &update).unwrap().unwrap();
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        assert_eq!(updated.location, None);
    }

    #[test]
    fn delete_user_cascades() {
        let db = db();
        let user_1 = signup(&db, "test1", "email1@email.com");
        let user_2 = signup(&db, "test2", "email2@email.com");

        let own = db.insert_message(user_1.id, "mine").unwrap();
        let other = db.insert_message(user_2.id, "theirs").unwrap();
        db.add_like(user_1.id, other.id).unwrap();
        db.add_like(user_2.id, own.id).unwrap();
        db.follow(user_1.id, user_2.id).unwrap();
        db.follow(user_2.id, user_1.id).unwrap();

        db.delete_user(user_1.id).unwrap();

        assert!(db.get_user(user_1.id).unwrap().is_none());
        assert!(db.get_message(own.id).unwrap().is_none());
        assert_eq!(db.count_likes().unwrap(), 0);
        assert!(db.followers(user_2.id).unwrap().is_empty());
        assert!(db.following(user_2.id).unwrap().is_empty());
        assert!(matches!(
            db.delete_user(user_1.id),
            Err(DbError::NotFound { entity: "user", .. })
        ));
    }

    // -- Follows --

    #[test]
    fn follows_are_directed() {
        let db = db();
        let user_1 = signup(&db, "test1", "email1@email.com");
        let user_2 = signup(&db, "test2", "email2@email.com");

        assert!(db.follow(user_1.id, user_2.id).unwrap());

        assert_eq!(ids(&db.followers(user_2.id).unwrap()), vec![user_1.id]);
        assert_eq!(ids(&db.following(user_1.id).unwrap()), vec![user_2.id]);
        assert!(db.followers(user_1.id).unwrap().is_empty());
        assert!(db.following(user_2.id).unwrap().is_empty());
    }

    #[test]
    fn is_following_and_is_followed_by() {
        let db = db();
        let user_1 = signup(&db, "test1", "email1@email.com");
        let user_2 = signup(&db, "test2", "email2@email.com");

        db.follow(user_1.id, user_2.id).unwrap();

        assert!(db.is_following(user_1.id, user_2.id).unwrap());
        assert!(!db.is_following(user_2.id, user_1.id).unwrap());
        assert!(db.is_followed_by(user_2.id, user_1.id).unwrap());
        assert!(!db.is_followed_by(user_1.id, user_2.id).unwrap());
    }

    #[test]
    fn follow_twice_and_unfollow() {
        let db = db();
        let user_1 = signup(&db, "test1", "email1@email.com");
        let user_2 = signup(&db, "test2", "email2@email.com");

        assert!(db.follow(user_1.id, user_2.id).unwrap());
        assert!(!db.follow(user_1.id, user_2.id).unwrap());
        assert_eq!(db.followers(user_2.id).unwrap().len(), 1);

        assert!(db.unfollow(user_1.id, user_2.id).unwrap());
        assert!(!db.unfollow(user_1.id, user_2.id).unwrap());
        assert!(!db.is_following(user_1.id, user_2.id).unwrap());
    }

    #[test]
    fn follow_unknown_user_is_not_found() {
        let db = db();
        let user = signup(&db, "test1", "email1@email.com");
        assert!(matches!(
            db.follow(user.id, 9999),
            Err(DbError::NotFound { entity: "user", id: 9999 })
        ));
    }

    // -- Messages --

    #[test]
    fn message_belongs_to_user() {
        let db = db();
        let user = signup(&db, "tester", "tester@tester.com");

        db.insert_message(user.id, "test text").unwrap();

        let messages = db.user_messages(user.id, 100).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "test text");
        assert_eq!(messages[0].author_username, "tester");
    }

    #[test]
    fn message_requires_existing_user() {
        let db = db();
        assert!(matches!(
            db.insert_message(4242, "orphan"),
            Err(DbError::MissingReference)
        ));
    }

    #[test]
    fn message_length_is_bounded() {
        let db = db();
        let user = signup(&db, "tester", "tester@tester.com");

        let longest = "w".repeat(MAX_MESSAGE_LEN);
        assert!(db.insert_message(user.id, &longest).is_ok());
        assert!(matches!(
            db.insert_message(user.id, &format!("{longest}!")),
            Err(DbError::TextTooLong)
        ));
        assert!(matches!(db.insert_message(user.id, ""), Err(DbError::TextTooLong)));
    }

    #[test]
    fn only_owner_deletes_message() {
        let db = db();
        let owner = signup(&db, "owner", "owner@test.com");
        let other = signup(&db, "other", "other@test.com");
        let msg = db.insert_message(owner.id, "keep me").unwrap();

        assert!(matches!(
            db.delete_message(msg.id, other.id),
            Err(DbError::NotOwner(id)) if id == msg.id
        ));
        assert!(db.get_message(msg.id).unwrap().is_some());

        db.delete_message(msg.id, owner.id).unwrap();
        assert!(db.get_message(msg.id).unwrap().is_none());
    }

    #[test]
    fn home_feed_covers_self_and_followed() {
        let db = db();
        let me = signup(&db, "me", "me@test.com");
        let friend = signup(&db, "friend", "friend@test.com");
        let stranger = signup(&db, "stranger", "stranger@test.com");
        db.follow(me.id, friend.id).unwrap();

        db.insert_message(me.id, "mine").unwrap();
        db.insert_message(friend.id, "friend's").unwrap();
        db.insert_message(stranger.id, "stranger's").unwrap();

        let texts: Vec<String> = db
            .home_feed(me.id, 100)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["friend's", "mine"]);
        assert_eq!(db.home_feed(me.id, 1).unwrap().len(), 1);
    }

    // -- Likes --

    #[test]
    fn like_is_recorded_once() {
        let db = db();
        let author = signup(&db, "tester", "tester@tester.com");
        let liker = signup(&db, "onemoretestiswear", "iswear@test.com");
        let m1 = db.insert_message(author.id, "test text").unwrap();
        db.insert_message(author.id, "More tests for the testing tester")
            .unwrap();

        db.add_like(liker.id, m1.id).unwrap();

        let likes = db.likes_for_user(liker.id).unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].message_id, m1.id);

        assert!(matches!(
            db.add_like(liker.id, m1.id),
            Err(DbError::Duplicate { .. })
        ));
    }

    #[test]
    fn toggle_like_adds_then_removes() {
        let db = db();
        let author = signup(&db, "author", "author@test.com");
        let liker = signup(&db, "liker", "liker@test.com");
        let msg = db.insert_message(author.id, "like this please").unwrap();

        assert!(db.toggle_like(liker.id, msg.id).unwrap());
        let likes = db.likes_for_message(msg.id).unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].user_id, liker.id);
        assert_eq!(db.liked_message_ids(liker.id).unwrap(), HashSet::from([msg.id]));

        assert!(!db.toggle_like(liker.id, msg.id).unwrap());
        assert!(db.likes_for_message(msg.id).unwrap().is_empty());
    }

    #[test]
    fn toggle_like_refuses_own_and_missing_messages() {
        let db = db();
        let author = signup(&db, "author", "author@test.com");
        let msg = db.insert_message(author.id, "my own").unwrap();

        assert!(matches!(db.toggle_like(author.id, msg.id), Err(DbError::OwnMessage)));
        assert!(matches!(
            db.toggle_like(author.id, 777),
            Err(DbError::NotFound { entity: "message", id: 777 })
        ));
        assert_eq!(db.count_likes().unwrap(), 0);
    }

    #[test]
    fn deleting_message_removes_its_likes() {
        let db = db();
        let author = signup(&db, "author", "author@test.com");
        let liker = signup(&db, "liker", "liker@test.com");
        let msg = db.insert_message(author.id, "short lived").unwrap();
        db.add_like(liker.id, msg.id).unwrap();

        db.delete_message(msg.id, author.id).unwrap();
        assert!(db.likes_for_user(liker.id).unwrap().is_empty());
    }

    #[test]
    fn stats_count_each_relation() {
        let db = db();
        let me = signup(&db, "testuser", "testuser@example.com");
        let other = signup(&db, "135", "test1@test.com");

        db.insert_message(me.id, "test message one").unwrap();
        db.insert_message(me.id, "test message two").unwrap();
        let theirs = db.insert_message(other.id, "test message three").unwrap();
        db.add_like(me.id, theirs.id).unwrap();

        assert_eq!(
            db.user_stats(me.id).unwrap(),
            UserStats {
                messages: 2,
                following: 0,
                followers: 0,
                likes: 1,
            }
        );

        let liked = db.liked_messages(me.id).unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].text, "test message three");
    }
}
