//! Error types for backup artifact analysis
//!
//! Errors split into two groups:
//! - fatal for one archive (`NotFound`, `CorruptArchive`, `Cancelled`, I/O on
//!   the archive itself), surfaced as a failed outcome
//! - benign (`EmptyArchive`, `UnsupportedEntry`, `UnrecognizedHeader`,
//!   `SchemaMismatch`, `QueryError`, `CleanupWarning`, `Sqlite`), folded into
//!   findings of a successful outcome by the pipeline

use std::fmt;
use std::io;

/// Result type alias for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that can occur while analyzing a backup archive
#[derive(Debug)]
pub enum AnalysisError {
    /// Archive path does not exist
    NotFound(String),
    /// Central directory unreadable or an entry checksum mismatched
    CorruptArchive {
        entry: Option<String>,
        reason: String,
    },
    /// Archive has no file entries
    EmptyArchive,
    /// Entry uses a compression method or encryption the reader lacks
    UnsupportedEntry { entry: String, reason: String },
    /// Proprietary header could not be decoded
    UnrecognizedHeader(String),
    /// No known marker table in an embedded database
    SchemaMismatch,
    /// Aggregate query failed against an open database
    QueryError {
        table: String,
        column: Option<String>,
        reason: String,
    },
    /// Temporary file could not be deleted
    CleanupWarning(String),
    /// Run was cancelled between stages
    Cancelled,
    /// I/O error (file read/write)
    Io(io::Error),
    /// SQLite error outside of an aggregate query
    Sqlite(rusqlite::Error),
    /// Configuration could not be loaded or parsed
    Config(String),
}

impl AnalysisError {
    /// Whether this error aborts the analysis of an archive
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::NotFound(_)
                | AnalysisError::CorruptArchive { .. }
                | AnalysisError::Cancelled
                | AnalysisError::Io(_)
                | AnalysisError::Config(_)
        )
    }

    /// Short stable name, used as the failure reason code
    pub fn kind_name(&self) -> &'static str {
        match self {
            AnalysisError::NotFound(_) => "NotFound",
            AnalysisError::CorruptArchive { .. } => "CorruptArchive",
            AnalysisError::EmptyArchive => "EmptyArchive",
            AnalysisError::UnsupportedEntry { .. } => "UnsupportedEntry",
            AnalysisError::UnrecognizedHeader(_) => "UnrecognizedHeader",
            AnalysisError::SchemaMismatch => "SchemaMismatch",
            AnalysisError::QueryError { .. } => "QueryError",
            AnalysisError::CleanupWarning(_) => "CleanupWarning",
            AnalysisError::Cancelled => "Cancelled",
            AnalysisError::Io(_) => "Io",
            AnalysisError::Sqlite(_) => "Sqlite",
            AnalysisError::Config(_) => "Config",
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::NotFound(path) => write!(f, "Archive not found: {}", path),
            AnalysisError::CorruptArchive { entry: Some(entry), reason } => {
                write!(f, "Corrupt archive entry '{}': {}", entry, reason)
            }
            AnalysisError::CorruptArchive { entry: None, reason } => {
                write!(f, "Corrupt archive: {}", reason)
            }
            AnalysisError::EmptyArchive => write!(f, "Archive contains no entries"),
            AnalysisError::UnsupportedEntry { entry, reason } => {
                write!(f, "Entry '{}' not readable: {}", entry, reason)
            }
            AnalysisError::UnrecognizedHeader(e) => write!(f, "Unrecognized header: {}", e),
            AnalysisError::SchemaMismatch => write!(f, "No known marker table found"),
            AnalysisError::QueryError { table, column: Some(column), reason } => {
                write!(f, "Query failed on {}.{}: {}", table, column, reason)
            }
            AnalysisError::QueryError { table, column: None, reason } => {
                write!(f, "Query failed on {}: {}", table, reason)
            }
            AnalysisError::CleanupWarning(e) => write!(f, "Cleanup warning: {}", e),
            AnalysisError::Cancelled => write!(f, "Analysis cancelled"),
            AnalysisError::Io(e) => write!(f, "I/O error: {}", e),
            AnalysisError::Sqlite(e) => write!(f, "SQLite error: {}", e),
            AnalysisError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Io(e) => Some(e),
            AnalysisError::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for AnalysisError {
    fn from(err: io::Error) -> Self {
        AnalysisError::Io(err)
    }
}

impl From<rusqlite::Error> for AnalysisError {
    fn from(err: rusqlite::Error) -> Self {
        AnalysisError::Sqlite(err)
    }
}

impl From<zip::result::ZipError> for AnalysisError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => AnalysisError::Io(e),
            other => AnalysisError::CorruptArchive {
                entry: None,
                reason: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Config(err.to_string())
    }
}
