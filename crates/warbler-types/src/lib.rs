//! Warbler domain models.
//!
//! These are the storage-independent shapes handed out by `warbler-db`.
//! Row types and SQL live in that crate; nothing here knows about SQLite.

pub mod models;

pub use models::{Follow, Like, Message, User};
