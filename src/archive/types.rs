//! Archive type definitions
//!
//! An [`ArchiveHandle`] is a summary of an opened ZIP container. It never
//! keeps the underlying file open: every read reopens the archive for the
//! duration of that read.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::common::DigestAlgorithm;

/// Outcome of the integrity check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntegrityStatus {
    Intact,
    Corrupt,
    /// Not checked (or not yet determined)
    Unknown,
}

/// Database label guessed from the archive filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatabaseLabel {
    BackupStaging,
    BackupVenus,
    Staging,
    Venus,
    Plantware,
}

impl std::fmt::Display for DatabaseLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseLabel::BackupStaging => write!(f, "BackupStaging"),
            DatabaseLabel::BackupVenus => write!(f, "BackupVenus"),
            DatabaseLabel::Staging => write!(f, "Staging"),
            DatabaseLabel::Venus => write!(f, "Venus"),
            DatabaseLabel::Plantware => write!(f, "Plantware"),
        }
    }
}

/// Archive digest computed on request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveDigest {
    pub algorithm: DigestAlgorithm,
    pub value: String,
}

/// Options for opening an archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Decompress every entry and recompute CRC-32 (O(total uncompressed size))
    pub strict_crc: bool,
    /// Compute a whole-archive digest
    pub digest: Option<DigestAlgorithm>,
}

/// One file entry of an archive (directories are not listed)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveEntry {
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
    pub compressed_size: u64,
    /// Percentage of space saved by compression (0 for empty entries)
    pub compression_ratio: f64,
    pub crc32: u32,
    pub extension: Option<String>,
    pub is_likely_database: bool,
}

impl ArchiveEntry {
    pub(crate) fn compression_ratio_of(size: u64, compressed_size: u64) -> f64 {
        if size == 0 {
            return 0.0;
        }
        let ratio = (1.0 - compressed_size as f64 / size as f64) * 100.0;
        (ratio * 100.0).round() / 100.0
    }
}

/// Summary of an opened archive
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveHandle {
    /// Absolute path (identity)
    pub path: PathBuf,
    pub file_name: String,
    /// Size on disk in bytes
    pub total_size: u64,
    /// Sum of entry uncompressed sizes
    pub uncompressed_size: u64,
    pub entry_count: usize,
    pub integrity: IntegrityStatus,
    /// Date parsed from the archive filename
    pub filename_date: Option<NaiveDateTime>,
    /// Filesystem modification time (local)
    pub modified: Option<NaiveDateTime>,
    pub label: Option<DatabaseLabel>,
    /// Percentage of space saved across all entries
    pub compression_ratio: f64,
    pub digest: Option<ArchiveDigest>,
    pub(crate) entries: Vec<ArchiveEntry>,
}

impl ArchiveHandle {
    /// Entries sorted by uncompressed size, largest first
    pub fn list_entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File stem used to name temporary materializations
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "archive".to_string())
    }
}
