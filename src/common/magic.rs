//! Database payload classification via magic signatures
//!
//! Classifies an archive entry from its name, uncompressed size and a short
//! header prefix. The decision table is ordered; the first matching rule wins.
//!
//! | Rule | Input          | Condition                                  | Result          |
//! |------|----------------|--------------------------------------------|-----------------|
//! | (b)  | bytes 0..16    | `SQLite format 3\0`                        | Sqlite          |
//! | (c)  | bytes 0..4     | `TAPE`                                     | ProprietaryTape |
//! | (a)  | extension      | `.db`, `.sqlite`, `.sqlite3`               | Sqlite          |
//! | (d)  | extension      | `.bak`, `.dbf`, `.mdb`                     | UnknownBinary   |
//! | (e)  | no extension   | size > minimum (default 1 MiB)             | UnknownBinary*  |
//! | (f)  | -              | -                                          | NotADatabase    |
//!
//! Signature rules run before extension rules: archive producers are
//! inconsistent about extensions, magic bytes are not.
//! `*` flagged as requiring deeper inspection.

use serde::Serialize;

use super::binary::contains_bytes;

// =============================================================================
// Signatures
// =============================================================================

/// SQLite 3 database header
pub const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\x00";

/// Proprietary tape-format backup header (MTF descriptor block)
pub const TAPE_MAGIC: &[u8; 4] = b"TAPE";

/// Text marker embedded in SQL Server backup headers
pub const SQL_SERVER_MARKER: &[u8] = b"Microsoft SQL Server";

/// Tape descriptor blocks are aligned on this boundary
pub const TAPE_BLOCK_ALIGN: usize = 512;

/// Number of signature bytes recorded in a classification
pub const SIGNATURE_LEN: usize = 16;

pub const SQLITE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];
pub const BINARY_BACKUP_EXTENSIONS: &[&str] = &["bak", "dbf", "mdb"];

// =============================================================================
// Classification Types
// =============================================================================

/// Detected payload kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FormatKind {
    Sqlite,
    ProprietaryTape,
    UnknownBinary,
    NotADatabase,
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatKind::Sqlite => write!(f, "SQLite"),
            FormatKind::ProprietaryTape => write!(f, "Proprietary tape"),
            FormatKind::UnknownBinary => write!(f, "Unknown binary"),
            FormatKind::NotADatabase => write!(f, "Not a database"),
        }
    }
}

/// What evidence the classification rests on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceBasis {
    /// Filename extension match
    Extension,
    /// Magic byte match
    MagicBytes,
    /// Size threshold on an extensionless entry
    SizeHeuristic,
    /// No rule matched
    None,
}

/// Result of classifying one archive entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatClassification {
    pub kind: FormatKind,
    pub basis: ConfidenceBasis,
    /// Decision-table rule that matched ('a'..='f')
    pub rule: char,
    /// Hex of the first signature bytes examined
    pub signature_hex: String,
    #[serde(skip)]
    pub signature: Vec<u8>,
    pub requires_deeper_inspection: bool,
}

impl FormatClassification {
    fn new(kind: FormatKind, basis: ConfidenceBasis, rule: char, header: &[u8]) -> Self {
        let signature = header[..header.len().min(SIGNATURE_LEN)].to_vec();
        Self {
            kind,
            basis,
            rule,
            signature_hex: hex::encode(&signature),
            signature,
            requires_deeper_inspection: false,
        }
    }

    fn needs_inspection(mut self) -> Self {
        self.requires_deeper_inspection = true;
        self
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Lowercase extension of the last path component, if any
pub fn extension_of(name: &str) -> Option<String> {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn has_sqlite_magic(header: &[u8]) -> bool {
    header.len() >= SQLITE_MAGIC.len() && header[..SQLITE_MAGIC.len()] == SQLITE_MAGIC[..]
}

pub fn has_tape_magic(header: &[u8]) -> bool {
    header.len() >= TAPE_MAGIC.len() && header[..TAPE_MAGIC.len()] == TAPE_MAGIC[..]
}

/// Classify a payload by name, uncompressed size and header prefix
pub fn classify(name: &str, size: u64, header: &[u8], min_unknown_size: u64) -> FormatClassification {
    let ext = extension_of(name);

    if has_sqlite_magic(header) {
        return FormatClassification::new(FormatKind::Sqlite, ConfidenceBasis::MagicBytes, 'b', header);
    }

    if has_tape_magic(header) {
        return FormatClassification::new(
            FormatKind::ProprietaryTape,
            ConfidenceBasis::MagicBytes,
            'c',
            header,
        );
    }

    match ext.as_deref() {
        Some(e) if SQLITE_EXTENSIONS.contains(&e) => {
            FormatClassification::new(FormatKind::Sqlite, ConfidenceBasis::Extension, 'a', header)
        }
        Some(e) if BINARY_BACKUP_EXTENSIONS.contains(&e) => {
            FormatClassification::new(FormatKind::UnknownBinary, ConfidenceBasis::Extension, 'd', header)
        }
        None if size > min_unknown_size => FormatClassification::new(
            FormatKind::UnknownBinary,
            ConfidenceBasis::SizeHeuristic,
            'e',
            header,
        )
        .needs_inspection(),
        _ => FormatClassification::new(FormatKind::NotADatabase, ConfidenceBasis::None, 'f', header),
    }
}

// =============================================================================
// Deeper Inspection
// =============================================================================

/// Markers found when scanning a larger probe of an unidentified payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeepInspection {
    /// Offsets of tape descriptor blocks found on block boundaries
    pub tape_block_offsets: Vec<usize>,
    pub sql_server_marker: bool,
    /// Offset of an embedded SQLite header
    pub sqlite_offset: Option<usize>,
}

impl DeepInspection {
    pub fn is_empty(&self) -> bool {
        self.tape_block_offsets.is_empty() && !self.sql_server_marker && self.sqlite_offset.is_none()
    }

    /// Human-readable notes for findings
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if let Some(first) = self.tape_block_offsets.first() {
            notes.push(format!(
                "Tape descriptor block found at offset {} ({} total in probe)",
                first,
                self.tape_block_offsets.len()
            ));
        }
        if self.sql_server_marker {
            notes.push("SQL Server backup marker present in probe".to_string());
        }
        if let Some(offset) = self.sqlite_offset {
            notes.push(format!("Embedded SQLite header at offset {}", offset));
        }
        notes
    }
}

/// Scan a probe for embedded database markers
pub fn deep_inspect(probe: &[u8]) -> DeepInspection {
    let tape_block_offsets = (0..probe.len())
        .step_by(TAPE_BLOCK_ALIGN)
        .filter(|&offset| has_tape_magic(&probe[offset..]))
        .collect();

    let sqlite_offset = (0..probe.len())
        .step_by(TAPE_BLOCK_ALIGN)
        .find(|&offset| has_sqlite_magic(&probe[offset..]));

    DeepInspection {
        tape_block_offsets,
        sql_server_marker: contains_bytes(probe, SQL_SERVER_MARKER),
        sqlite_offset,
    }
}
