use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use tracing::debug;
use warbler_types::Message;

use crate::error::Result;
use crate::models::{
    MESSAGE_COLUMNS, NewMessage, format_timestamp, message_from_row, normalize_timestamp,
};
use crate::uow::UnitOfWork;

/// Home timeline page size.
pub const DEFAULT_TIMELINE_LIMIT: u32 = 100;

impl UnitOfWork<'_> {
    pub fn add_message(&self, user_id: i64, new_message: &NewMessage) -> Result<Message> {
        let timestamp = normalize_timestamp(new_message.timestamp.unwrap_or_else(Utc::now));

        self.conn().execute(
            "INSERT INTO messages (text, timestamp, user_id) VALUES (?1, ?2, ?3)",
            params![new_message.text, format_timestamp(&timestamp), user_id],
        )?;

        let id = self.conn().last_insert_rowid();
        debug!("Staged message {} by user {}", id, user_id);

        Ok(Message {
            id,
            text: new_message.text.clone(),
            timestamp,
            user_id,
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<Message>> {
        let message = self
            .conn()
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = ?1"),
                [id],
                message_from_row,
            )
            .optional()?;
        Ok(message)
    }

    /// Removes the message and every like on it.
    pub fn delete_message(&self, id: i64) -> Result<bool> {
        let removed = self.conn().execute("DELETE FROM messages WHERE id = ?1", [id])?;
        debug!("Staged delete of message {} ({} row)", id, removed);
        Ok(removed > 0)
    }

    /// A user's messages, newest first.
    pub fn messages_for_user(&self, user_id: i64) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m
             WHERE m.user_id = ?1
             ORDER BY m.timestamp DESC, m.id DESC"
        ))?;
        let messages = stmt
            .query_map([user_id], message_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// The user's own messages and those of everyone they follow,
    /// newest first.
    pub fn timeline(&self, user_id: i64, limit: u32) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m
             WHERE m.user_id = ?1
                OR m.user_id IN (SELECT followed_id FROM follows WHERE follower_id = ?1)
             ORDER BY m.timestamp DESC, m.id DESC
             LIMIT ?2"
        ))?;
        let messages = stmt
            .query_map(params![user_id, limit], message_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    pub fn count_messages(&self, user_id: i64) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
