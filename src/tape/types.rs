//! Type definitions for proprietary tape-format headers

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Fixed header length examined by the analyzer
pub const TAPE_HEADER_LEN: usize = 32;

// Field offsets
pub const VERSION_OFFSET: usize = 4;
pub const FLAGS_OFFSET: usize = 8;
pub const TIMESTAMP_OFFSET: usize = 12;
pub const OPAQUE_OFFSET: usize = 20;

/// Backup producer guessed from the header probe and entry name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapeVariant {
    SqlServerMtf,
    PlantwareP3,
    GenericTape,
}

impl std::fmt::Display for TapeVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TapeVariant::SqlServerMtf => write!(f, "SQL Server MTF"),
            TapeVariant::PlantwareP3 => write!(f, "Plantware P3"),
            TapeVariant::GenericTape => write!(f, "Generic tape"),
        }
    }
}

/// Header analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Average record size in bytes, per variant
    pub plantware_record_size: u64,
    pub sql_server_record_size: u64,
    pub generic_record_size: u64,
    /// Accepted embedded timestamp years (inclusive)
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            plantware_record_size: 500,
            sql_server_record_size: 1000,
            generic_record_size: 1000,
            min_year: 1980,
            max_year: 2100,
        }
    }
}

impl HeaderConfig {
    pub fn record_size(&self, variant: TapeVariant) -> u64 {
        match variant {
            TapeVariant::PlantwareP3 => self.plantware_record_size,
            TapeVariant::SqlServerMtf => self.sql_server_record_size,
            TapeVariant::GenericTape => self.generic_record_size,
        }
    }
}

/// Decoded proprietary header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProprietaryHeaderInfo {
    pub magic: String,
    pub version: u32,
    pub flags: u32,
    /// Embedded creation time (UTC); None when zero or implausible
    pub timestamp: Option<NaiveDateTime>,
    /// Bytes 20..32, preserved uninterpreted
    pub opaque_hex: String,
    pub variant: TapeVariant,
    pub estimated_record_count: Option<u64>,
    /// Always true: the count is derived from size, not read from the file
    pub record_count_is_estimate: bool,
    pub record_size: u64,
    pub database_name: Option<String>,
    pub server_name: Option<String>,
    pub notes: Vec<String>,
}
