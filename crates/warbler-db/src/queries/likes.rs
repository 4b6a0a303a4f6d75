use rusqlite::{OptionalExtension, params};
use tracing::debug;
use warbler_types::{Like, Message};

use crate::error::Result;
use crate::models::{LIKE_COLUMNS, LikeToggle, MESSAGE_COLUMNS, like_from_row, message_from_row};
use crate::uow::UnitOfWork;

impl UnitOfWork<'_> {
    /// Liking the same message twice, or a message or user that does not
    /// exist, is an integrity error.
    pub fn add_like(&self, user_id: i64, message_id: i64) -> Result<Like> {
        self.conn().execute(
            "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
            params![user_id, message_id],
        )?;
        let id = self.conn().last_insert_rowid();
        debug!("Staged like {} of message {} by user {}", id, message_id, user_id);
        Ok(Like {
            id,
            user_id,
            message_id,
        })
    }

    pub fn remove_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
            params![user_id, message_id],
        )?;
        debug!("Staged unlike of message {} by user {} ({} row)", message_id, user_id, removed);
        Ok(removed > 0)
    }

    /// Remove the like if it exists, add it otherwise.
    pub fn toggle_like(&self, user_id: i64, message_id: i64) -> Result<LikeToggle> {
        let existing: Option<i64> = self
            .conn()
            .query_row(
                "SELECT id FROM likes WHERE user_id = ?1 AND message_id = ?2",
                params![user_id, message_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing_id) = existing {
            self.conn().execute("DELETE FROM likes WHERE id = ?1", [existing_id])?;
            debug!("Toggled off like {}", existing_id);
            Ok(LikeToggle::Removed)
        } else {
            self.add_like(user_id, message_id).map(LikeToggle::Added)
        }
    }

    pub fn likes_by_user(&self, user_id: i64) -> Result<Vec<Like>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LIKE_COLUMNS} FROM likes l WHERE l.user_id = ?1 ORDER BY l.id"
        ))?;
        let likes = stmt
            .query_map([user_id], like_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(likes)
    }

    pub fn all_likes(&self) -> Result<Vec<Like>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {LIKE_COLUMNS} FROM likes l ORDER BY l.id"))?;
        let likes = stmt
            .query_map([], like_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(likes)
    }

    /// Messages `user_id` has liked, in the order they were liked.
    pub fn liked_messages(&self, user_id: i64) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM likes l
             JOIN messages m ON m.id = l.message_id
             WHERE l.user_id = ?1
             ORDER BY l.id"
        ))?;
        let messages = stmt
            .query_map([user_id], message_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    pub fn likes_for_message(&self, message_id: i64) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM likes WHERE message_id = ?1",
            [message_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
