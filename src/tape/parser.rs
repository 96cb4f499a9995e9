//! Proprietary tape header parsing
//!
//! Only the fixed 32-byte prefix is decoded. Everything after it is opaque;
//! the record count is estimated from the entry size.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDateTime};
use regex::Regex;
use tracing::debug;

use super::types::*;
use crate::common::binary::{bytes_to_string, u32_le_at, u64_le_at};
use crate::common::magic::{has_tape_magic, SQL_SERVER_MARKER};
use crate::error::{AnalysisError, AnalysisResult};
use crate::sync::dates::local_from_utc;

fn label_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"Database:\s*([A-Za-z0-9_.\-]+)").expect("Invalid database label regex"),
            Regex::new(r"Server:\s*([A-Za-z0-9_.\-\\]+)").expect("Invalid server label regex"),
        )
    })
}

/// Printable text of a probe
///
/// NUL bytes are dropped so UTF-16LE labels read as ASCII; other
/// non-printable bytes become spaces.
fn probe_text(probe: &[u8]) -> String {
    probe
        .iter()
        .filter(|&&b| b != 0)
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
        .collect()
}

fn detect_variant(text: &str, entry_name: &str) -> TapeVariant {
    let marker = String::from_utf8_lossy(SQL_SERVER_MARKER);
    if text.contains(marker.as_ref()) {
        return TapeVariant::SqlServerMtf;
    }
    let lower = entry_name.to_lowercase();
    if lower.contains("plantware") || lower.contains("p3") {
        TapeVariant::PlantwareP3
    } else {
        TapeVariant::GenericTape
    }
}

/// Decode the embedded timestamp; returns a note when the value is rejected
fn decode_timestamp(raw: u64, config: &HeaderConfig) -> (Option<NaiveDateTime>, Option<String>) {
    if raw == 0 {
        return (None, None);
    }
    let decoded = i64::try_from(raw)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(local_from_utc)
        .filter(|dt| (config.min_year..=config.max_year).contains(&dt.year()));
    match decoded {
        Some(ts) => (Some(ts), None),
        None => (
            None,
            Some(format!("Embedded timestamp {} outside plausible range, ignored", raw)),
        ),
    }
}

/// Analyze the header prefix of a proprietary tape-format entry
///
/// `bytes` is the probed prefix (at least 32 bytes for a valid header; a
/// longer probe lets text labels be found). Truncated or foreign input yields
/// `UnrecognizedHeader`, never a panic.
pub fn analyze_header(
    bytes: &[u8],
    entry_size: u64,
    entry_name: &str,
    config: &HeaderConfig,
) -> AnalysisResult<ProprietaryHeaderInfo> {
    if bytes.len() < TAPE_HEADER_LEN {
        return Err(AnalysisError::UnrecognizedHeader(format!(
            "header too short: {} of {} bytes",
            bytes.len(),
            TAPE_HEADER_LEN
        )));
    }
    if !has_tape_magic(bytes) {
        return Err(AnalysisError::UnrecognizedHeader(format!(
            "unexpected magic {}",
            hex::encode(&bytes[..4])
        )));
    }

    let short = || AnalysisError::UnrecognizedHeader("header field out of range".to_string());
    let version = u32_le_at(bytes, VERSION_OFFSET).ok_or_else(short)?;
    let flags = u32_le_at(bytes, FLAGS_OFFSET).ok_or_else(short)?;
    let raw_timestamp = u64_le_at(bytes, TIMESTAMP_OFFSET).ok_or_else(short)?;
    let opaque = &bytes[OPAQUE_OFFSET..TAPE_HEADER_LEN];

    let mut notes = Vec::new();
    let (timestamp, timestamp_note) = decode_timestamp(raw_timestamp, config);
    notes.extend(timestamp_note);

    let text = probe_text(bytes);
    let variant = detect_variant(&text, entry_name);
    let (db_re, server_re) = label_patterns();
    let database_name = db_re.captures(&text).map(|c| c[1].to_string());
    let server_name = server_re.captures(&text).map(|c| c[1].to_string());

    let record_size = config.record_size(variant);
    let estimated_record_count = if record_size == 0 {
        notes.push("Record size is zero, no estimate".to_string());
        None
    } else {
        Some(entry_size.saturating_sub(TAPE_HEADER_LEN as u64) / record_size)
    };

    debug!(
        %variant,
        version,
        flags,
        has_timestamp = timestamp.is_some(),
        estimated_records = ?estimated_record_count,
        "Tape header analyzed"
    );

    Ok(ProprietaryHeaderInfo {
        magic: bytes_to_string(&bytes[..4]),
        version,
        flags,
        timestamp,
        opaque_hex: hex::encode(opaque),
        variant,
        estimated_record_count,
        record_count_is_estimate: true,
        record_size,
        database_name,
        server_name,
        notes,
    })
}
