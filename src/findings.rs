//! Findings attached to an otherwise successful analysis
//!
//! Benign errors (empty archive, unrecognized header, schema mismatch, query
//! failures, cleanup warnings) and date-sync observations all end up here, so
//! one bad table never discards a whole archive's analysis.

use serde::Serialize;

use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FindingKind {
    EmptyArchive,
    UnrecognizedHeader,
    SchemaMismatch,
    TableMissing,
    QueryError,
    CleanupWarning,
    UnreadableEntry,
    DeepInspection,
    HeaderNote,
    LaggingColumn,
    FutureDate,
    NoDates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    /// Entry name or `table.column` the finding refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

impl Finding {
    pub fn new(kind: FindingKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            subject: None,
            message: message.into(),
        }
    }

    pub fn info(kind: FindingKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    pub fn warning(kind: FindingKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, message)
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Convert a benign error into a finding; fatal errors return None
    pub fn from_error(err: &AnalysisError) -> Option<Self> {
        let finding = match err {
            AnalysisError::EmptyArchive => Finding::warning(FindingKind::EmptyArchive, err.to_string()),
            AnalysisError::UnsupportedEntry { entry, .. } => {
                Finding::new(FindingKind::UnreadableEntry, Severity::Error, err.to_string()).with_subject(entry.clone())
            }
            AnalysisError::UnrecognizedHeader(_) => {
                Finding::warning(FindingKind::UnrecognizedHeader, err.to_string())
            }
            AnalysisError::SchemaMismatch => Finding::info(FindingKind::SchemaMismatch, err.to_string()),
            AnalysisError::QueryError { table, column, .. } => {
                let subject = match column {
                    Some(column) => format!("{table}.{column}"),
                    None => table.clone(),
                };
                Finding::warning(FindingKind::QueryError, err.to_string()).with_subject(subject)
            }
            AnalysisError::CleanupWarning(_) => Finding::warning(FindingKind::CleanupWarning, err.to_string()),
            AnalysisError::Sqlite(_) => Finding::new(FindingKind::QueryError, Severity::Error, err.to_string()),
            _ => return None,
        };
        Some(finding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_benign_error() {
        let err = AnalysisError::QueryError {
            table: "GWSCANNER".into(),
            column: Some("SCAN_DATE".into()),
            reason: "no such column".into(),
        };
        let finding = Finding::from_error(&err).unwrap();
        assert_eq!(finding.kind, FindingKind::QueryError);
        assert_eq!(finding.subject.as_deref(), Some("GWSCANNER.SCAN_DATE"));
    }

    #[test]
    fn test_fatal_error_is_not_a_finding() {
        assert!(Finding::from_error(&AnalysisError::NotFound("a.zip".into())).is_none());
        assert!(Finding::from_error(&AnalysisError::Cancelled).is_none());
        let corrupt = AnalysisError::CorruptArchive {
            entry: Some("staging.db".into()),
            reason: "Invalid checksum".into(),
        };
        assert!(Finding::from_error(&corrupt).is_none());
    }

    #[test]
    fn test_unsupported_entry_is_unreadable() {
        let err = AnalysisError::UnsupportedEntry {
            entry: "archive.bz2".into(),
            reason: "Compression method not supported".into(),
        };
        let finding = Finding::from_error(&err).unwrap();
        assert_eq!(finding.kind, FindingKind::UnreadableEntry);
        assert_eq!(finding.subject.as_deref(), Some("archive.bz2"));
    }
}
