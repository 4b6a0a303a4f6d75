use rusqlite::params;
use tracing::debug;
use warbler_types::{Follow, User};

use crate::error::Result;
use crate::models::{USER_COLUMNS, user_from_row};
use crate::uow::UnitOfWork;

impl UnitOfWork<'_> {
    /// `follower_id` starts following `followed_id`. Following twice, or
    /// following a user that does not exist, is an integrity error.
    pub fn add_follow(&self, follower_id: i64, followed_id: i64) -> Result<Follow> {
        self.conn().execute(
            "INSERT INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
            params![follower_id, followed_id],
        )?;
        debug!("Staged follow {} -> {}", follower_id, followed_id);
        Ok(Follow {
            follower_id,
            followed_id,
        })
    }

    pub fn remove_follow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
            params![follower_id, followed_id],
        )?;
        debug!("Staged unfollow {} -> {} ({} row)", follower_id, followed_id, removed);
        Ok(removed > 0)
    }

    /// Users that `user_id` follows, in the order they were followed.
    pub fn following(&self, user_id: i64) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM follows f
             JOIN users u ON u.id = f.followed_id
             WHERE f.follower_id = ?1
             ORDER BY f.rowid"
        ))?;
        let users = stmt
            .query_map([user_id], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Users following `user_id`, in the order they followed.
    pub fn followers(&self, user_id: i64) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM follows f
             JOIN users u ON u.id = f.follower_id
             WHERE f.followed_id = ?1
             ORDER BY f.rowid"
        ))?;
        let users = stmt
            .query_map([user_id], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Does `user_id` follow `other_id`?
    pub fn is_following(&self, user_id: i64, other_id: i64) -> Result<bool> {
        let found = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2)",
            params![user_id, other_id],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Is `user_id` followed by `other_id`?
    pub fn is_followed_by(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.is_following(other_id, user_id)
    }
}
