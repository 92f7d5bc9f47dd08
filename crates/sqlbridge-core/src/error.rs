//! Error types for sqlbridge

use thiserror::Error;

/// Broad classification of a [`DbError`], used when reporting failures
/// back through the tool boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Connection,
    Statement,
    Release,
    InvalidArgument,
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Connection => "connection",
            ErrorKind::Statement => "statement",
            ErrorKind::Release => "release",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Serialization => "serialization",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core error type for sqlbridge operations
///
/// The error is `Clone` so that a single failed pool initialization can be
/// handed to every caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Statement error: {0}")]
    Statement(String),

    #[error("Release error: {0}")]
    Release(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// The pool refuses all work once it has been closed.
    pub fn pool_closed() -> Self {
        DbError::Connection("connection pool is closed".into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Configuration(_) => ErrorKind::Configuration,
            DbError::Connection(_) => ErrorKind::Connection,
            DbError::Statement(_) => ErrorKind::Statement,
            DbError::Release(_) => ErrorKind::Release,
            DbError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            DbError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// The underlying message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            DbError::Configuration(msg)
            | DbError::Connection(msg)
            | DbError::Statement(msg)
            | DbError::Release(msg)
            | DbError::InvalidArgument(msg)
            | DbError::Serialization(msg) => msg,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, DbError::Connection(_))
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type alias for sqlbridge operations
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_closed_is_connection_error() {
        let err = DbError::pool_closed();
        assert!(err.is_connection());
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(err.to_string(), "Connection error: connection pool is closed");
    }

    #[test]
    fn test_message_strips_prefix() {
        let err = DbError::Statement("Table 'test01.missing' doesn't exist".into());
        assert_eq!(err.message(), "Table 'test01.missing' doesn't exist");
        assert_eq!(err.kind().as_str(), "statement");
    }

    #[test]
    fn test_serde_json_error_converts() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DbError = parse_err.into();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }
}
