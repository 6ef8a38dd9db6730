//! Error types for the timetable crate.
//!
//! Placement conflicts on the grid are not errors: the grid rejects or
//! reverts them silently. Everything here is a configuration, validation or
//! persistence failure that the caller has to see.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for timetable operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A timetable store rejected or failed to apply a change.
    #[error("timetable store failed: {0}")]
    Store(String),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Record Errors ===
    /// A timetable item failed boundary validation.
    #[error("invalid timetable item '{id}': {field} {message}")]
    InvalidItem {
        /// Id of the offending item.
        id: String,
        /// Name of the offending field.
        field: &'static str,
        /// Description of the violation.
        message: String,
    },

    /// Two items in a submitted list overlap on the same day.
    #[error("items '{first}' and '{second}' overlap on day {day}")]
    Overlap {
        /// Id of the earlier item.
        first: String,
        /// Id of the later item.
        second: String,
        /// Day index both items sit on.
        day: u32,
    },

    /// No item with the given id exists in the timetable.
    #[error("timetable item not found: {0}")]
    ItemNotFound(String),

    /// A user id was empty or contained unsupported characters.
    #[error("invalid user id: '{0}'")]
    InvalidUserId(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for timetable operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new store error.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an invalid item error for the given field.
    #[must_use]
    pub fn invalid_item(
        id: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidItem {
            id: id.into(),
            field,
            message: message.into(),
        }
    }

    /// Check if this error came from persisting a change.
    ///
    /// These are the failures that trigger a rollback of optimistic state.
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::DatabaseQuery(_) | Self::DatabaseOpen { .. } | Self::Json(_)
        )
    }
}
