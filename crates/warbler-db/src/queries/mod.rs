//! Repository operations, grouped by table. Everything is an inherent
//! method on `UnitOfWork` so a caller can never touch storage outside a
//! transaction.

mod follows;
mod likes;
mod messages;
mod users;

pub use messages::DEFAULT_TIMELINE_LIMIT;
