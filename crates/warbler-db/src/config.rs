use std::fmt;
use std::path::PathBuf;

use crate::error::{DbError, Result};

/// Environment variable naming the database.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

pub const DEFAULT_DB_PATH: &str = "warbler.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    Memory,
    File(PathBuf),
}

impl fmt::Display for DbLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str(":memory:"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub location: DbLocation,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            location: DbLocation::File(PathBuf::from(DEFAULT_DB_PATH)),
        }
    }
}

impl DbConfig {
    pub fn in_memory() -> Self {
        Self {
            location: DbLocation::Memory,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. An unset
    /// `DATABASE_URL` falls back to `warbler.db` in the working directory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(DATABASE_URL_VAR) {
            Some(url) => Ok(Self {
                location: parse_url(&url)?,
            }),
            None => Ok(Self::default()),
        }
    }
}

/// Accepts a bare path, `sqlite://<path>`, `sqlite:<path>`, `:memory:`
/// and `sqlite::memory:`.
pub fn parse_url(url: &str) -> Result<DbLocation> {
    let url = url.trim();

    if matches!(url, ":memory:" | "sqlite::memory:" | "sqlite://:memory:") {
        return Ok(DbLocation::Memory);
    }

    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
        rest
    } else if let Some((scheme, _)) = url.split_once("://") {
        return Err(DbError::Config(format!(
            "unsupported database scheme '{scheme}', only sqlite is available"
        )));
    } else {
        url
    };

    if path.is_empty() {
        return Err(DbError::Config(format!("{DATABASE_URL_VAR} names no database")));
    }

    Ok(DbLocation::File(PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(url: Option<&str>) -> Result<DbConfig> {
        DbConfig::from_lookup(|key| {
            assert_eq!(key, DATABASE_URL_VAR);
            url.map(str::to_string)
        })
    }

    #[test]
    fn unset_url_uses_default_file() {
        let config = config_with(None).unwrap();
        assert_eq!(config, DbConfig::default());
        assert_eq!(config.location.to_string(), "warbler.db");
    }

    #[test]
    fn memory_forms() {
        for url in [":memory:", "sqlite::memory:", "sqlite://:memory:"] {
            assert_eq!(parse_url(url).unwrap(), DbLocation::Memory, "{url}");
        }
    }

    #[test]
    fn file_forms() {
        let expected = DbLocation::File(PathBuf::from("/tmp/warbler-test.db"));
        assert_eq!(parse_url("/tmp/warbler-test.db").unwrap(), expected);
        assert_eq!(parse_url("sqlite:///tmp/warbler-test.db").unwrap(), expected);
        assert_eq!(parse_url("sqlite:/tmp/warbler-test.db").unwrap(), expected);
        assert_eq!(
            parse_url("  warbler-test.db\n").unwrap(),
            DbLocation::File(PathBuf::from("warbler-test.db"))
        );
    }

    #[test]
    fn postgres_url_is_rejected() {
        let err = config_with(Some("postgresql:///warbler-test")).unwrap_err();
        assert!(matches!(err, DbError::Config(ref msg) if msg.contains("postgresql")));
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(parse_url(""), Err(DbError::Config(_))));
        assert!(matches!(parse_url("sqlite://"), Err(DbError::Config(_))));
    }
}
