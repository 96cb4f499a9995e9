//! Entry-level detection heuristics
//!
//! Name/size heuristics for archive entries and archive filenames. Byte
//! signatures live in `common::magic`; this module feeds them the entry
//! attributes and detection thresholds.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::types::{ArchiveEntry, DatabaseLabel};
use crate::common::magic::{self, FormatClassification};

/// Extensions that mark an entry as a database payload
pub const DATABASE_EXTENSIONS: &[&str] = &[
    "bak", "db", "mdf", "ldf", "dbf", "mdb", "accdb", "sqlite", "sqlite3",
];

/// Keywords in entry names that suggest a backup payload
pub const BACKUP_NAME_KEYWORDS: &[&str] = &["plantware", "p3", "venus", "staging", "backup"];

/// Thresholds for format detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Extensionless entries above this size are treated as binary payloads
    pub min_unknown_binary_size: u64,
    /// Bytes read from an entry for signature and header checks
    pub header_probe_bytes: usize,
    /// Bytes read from an unidentified payload for deeper inspection
    pub deep_probe_bytes: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_unknown_binary_size: 1024 * 1024,
            header_probe_bytes: 4096,
            deep_probe_bytes: 64 * 1024,
        }
    }
}

fn has_backup_keyword(name: &str) -> bool {
    let lower = name.to_lowercase();
    BACKUP_NAME_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Likely-database flag from extension, size and name pattern
pub fn is_likely_database(name: &str, size: u64, config: &DetectionConfig) -> bool {
    match magic::extension_of(name) {
        Some(ext) => DATABASE_EXTENSIONS.contains(&ext.as_str()),
        None => size > config.min_unknown_binary_size || has_backup_keyword(name),
    }
}

/// Classify an archive entry from its header prefix
pub fn classify_entry(entry: &ArchiveEntry, header: &[u8], config: &DetectionConfig) -> FormatClassification {
    let classification = magic::classify(&entry.name, entry.size, header, config.min_unknown_binary_size);
    trace!(
        entry = %entry.name,
        kind = %classification.kind,
        rule = %classification.rule,
        "Entry classified"
    );
    classification
}

/// Database label hinted by the archive filename
pub fn database_label_from_filename(file_name: &str) -> Option<DatabaseLabel> {
    let lower = file_name.to_lowercase();

    if lower.contains("backupstaging") {
        Some(DatabaseLabel::BackupStaging)
    } else if lower.contains("backupvenus") {
        Some(DatabaseLabel::BackupVenus)
    } else if lower.contains("staging") {
        Some(DatabaseLabel::Staging)
    } else if lower.contains("venus") {
        Some(DatabaseLabel::Venus)
    } else if lower.contains("plantware") || lower.contains("ptrj") {
        Some(DatabaseLabel::Plantware)
    } else {
        None
    }
}
