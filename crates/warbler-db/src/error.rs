use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// Rejected before any storage access.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A UNIQUE, NOT NULL, CHECK, PRIMARY KEY or FOREIGN KEY constraint failed.
    #[error("integrity constraint violated: {0}")]
    Integrity(rusqlite::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("invalid database configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl DbError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::Integrity(err),
            _ => Self::Sqlite(err),
        }
    }
}
