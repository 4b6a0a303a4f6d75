//! Write-side inputs and row mappers.
//!
//! Reads hand back `warbler_types` models directly; the column lists below
//! fix the order every mapper expects.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use warbler_types::models::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};
use warbler_types::{Like, Message, User};

/// Users are always selected through the alias `u`.
pub(crate) const USER_COLUMNS: &str =
    "u.id, u.username, u.email, u.password, u.image_url, u.header_image_url, u.bio, u.location";

/// Messages are always selected through the alias `m`.
pub(crate) const MESSAGE_COLUMNS: &str = "m.id, m.text, m.timestamp, m.user_id";

pub(crate) const LIKE_COLUMNS: &str = "l.id, l.user_id, l.message_id";

/// A user that has been validated and hashed but not yet stored.
///
/// `username` and `email` stay optional so that a missing value surfaces
/// as a NOT NULL violation when the row is inserted, like a duplicate does.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl NewUser {
    pub fn new(
        username: Option<&str>,
        email: Option<&str>,
        password_hash: String,
        image_url: Option<&str>,
    ) -> Self {
        Self {
            id: None,
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            password_hash,
            image_url: image_url
                .filter(|url| !url.is_empty())
                .unwrap_or(DEFAULT_IMAGE_URL)
                .to_string(),
            header_image_url: DEFAULT_HEADER_IMAGE_URL.to_string(),
            bio: None,
            location: None,
        }
    }

    /// Pin the primary key instead of letting SQLite assign one.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub text: String,
    /// Defaults to the time of insertion.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Partial profile edit. `None` keeps the stored value. An empty string
/// clears `bio`/`location` and resets the images to their defaults.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Added(Like),
    Removed,
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
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

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let raw: String = row.get(2)?;
    let timestamp = parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(Message {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp,
        user_id: row.get(3)?,
    })
}

pub(crate) fn like_from_row(row: &Row<'_>) -> rusqlite::Result<Like> {
    Ok(Like {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message_id: row.get(2)?,
    })
}

/// Microsecond precision keeps stored values sortable as text.
pub(crate) fn normalize_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's datetime('now') form, no timezone. Treat as UTC.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
}
