//! ZIP integrity checks
//!
//! ## Quick check (default)
//! Reads the Central Directory (the metadata authority) and, for every entry,
//! the matching Local File Header. The name, CRC-32 and sizes stored in both
//! places must agree. No payload data is decompressed.
//!
//! Entries written with a data descriptor (flag bit 3) carry zero CRC and
//! sizes locally; their CRC is not compared and a local size only counts
//! when it is present (neither 0 nor the ZIP64 marker `0xFFFFFFFF`).
//!
//! ## Strict check (opt-in)
//! Decompresses every entry and recomputes its CRC-32. Cost is
//! O(total uncompressed size).
//!
//! ## Local File Header Layout
//! | Offset | Size | Field                  |
//! |--------|------|------------------------|
//! | 0x00   | 4    | Signature (PK\x03\x04) |
//! | 0x06   | 2    | General purpose flags  |
//! | 0x0E   | 4    | CRC-32                 |
//! | 0x12   | 4    | Compressed size        |
//! | 0x16   | 4    | Uncompressed size      |
//! | 0x1A   | 2    | File name length       |
//! | 0x1C   | 2    | Extra field length     |
//! | 0x1E   | n    | File name              |

use std::fs::File;
use std::io::Read;

use tracing::{debug, trace, warn};
use zip::ZipArchive;

use crate::common::binary::{read_bytes_at, u16_le_at, u32_le_at};
use crate::error::{AnalysisError, AnalysisResult};

pub const ZIP_LOCAL_HEADER_SIG: &[u8] = &[0x50, 0x4B, 0x03, 0x04]; // PK\x03\x04
pub const ZIP_CENTRAL_DIR_SIG: &[u8] = &[0x50, 0x4B, 0x01, 0x02]; // PK\x01\x02
pub const LOCAL_HEADER_LEN: usize = 30;

/// General purpose flag bit 3: CRC and sizes follow the data
const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

const STRICT_READ_BUFFER: usize = 256 * 1024;

fn corrupt(entry: &str, reason: impl Into<String>) -> AnalysisError {
    AnalysisError::CorruptArchive {
        entry: Some(entry.to_string()),
        reason: reason.into(),
    }
}

/// Whether a local header size contradicts the central directory
fn local_size_differs(local: u32, central: u64) -> bool {
    local != 0 && local != u32::MAX && u64::from(local) != central
}

/// Compare every Central Directory record with its Local File Header
pub fn verify_directory(archive: &mut ZipArchive<File>, raw: &mut File) -> AnalysisResult<()> {
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        let name = entry.name().to_string();
        let name_raw = entry.name_raw().to_vec();
        let central_crc = entry.crc32();
        let central_compressed = entry.compressed_size();
        let central_size = entry.size();
        let header_start = entry.header_start();
        drop(entry);

        let header = read_bytes_at(raw, header_start, LOCAL_HEADER_LEN)
            .map_err(|e| corrupt(&name, format!("local header unreadable: {e}")))?;

        if &header[..4] != ZIP_LOCAL_HEADER_SIG {
            return Err(corrupt(&name, format!("no local header at offset {header_start}")));
        }

        let flags = u16_le_at(&header, 0x06).unwrap_or(0);
        let local_crc = u32_le_at(&header, 0x0E).unwrap_or(0);
        let local_compressed = u32_le_at(&header, 0x12).unwrap_or(0);
        let local_size = u32_le_at(&header, 0x16).unwrap_or(0);
        let name_len = u16_le_at(&header, 0x1A).unwrap_or(0) as usize;

        let local_name = read_bytes_at(raw, header_start + LOCAL_HEADER_LEN as u64, name_len)
            .map_err(|e| corrupt(&name, format!("local file name unreadable: {e}")))?;
        if local_name != name_raw {
            return Err(corrupt(&name, "file name differs between central directory and local header"));
        }

        if local_size_differs(local_compressed, central_compressed) || local_size_differs(local_size, central_size) {
            warn!(entry = %name, local_compressed, local_size, "Size mismatch");
            return Err(corrupt(
                &name,
                format!(
                    "size mismatch: central directory {central_compressed}/{central_size}, \
                     local header {local_compressed}/{local_size}"
                ),
            ));
        }

        if flags & FLAG_DATA_DESCRIPTOR != 0 {
            trace!(entry = %name, "CRC stored in data descriptor, skipping quick comparison");
            continue;
        }

        if local_crc != central_crc {
            warn!(entry = %name, central_crc, local_crc, "Checksum mismatch");
            return Err(corrupt(
                &name,
                format!("CRC mismatch: central directory {central_crc:08x}, local header {local_crc:08x}"),
            ));
        }
    }

    debug!(entries = archive.len(), "Central directory verified");
    Ok(())
}

/// Decompress every entry and recompute its CRC-32
pub fn verify_full_crc(archive: &mut ZipArchive<File>) -> AnalysisResult<()> {
    let mut buf = vec![0u8; STRICT_READ_BUFFER];

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let expected = entry.crc32();
        let mut hasher = crc32fast::Hasher::new();

        loop {
            let n = entry
                .read(&mut buf)
                .map_err(|e| corrupt(&name, format!("decompression failed: {e}")))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        let actual = hasher.finalize();
        if actual != expected {
            return Err(corrupt(
                &name,
                format!("CRC mismatch: stored {expected:08x}, computed {actual:08x}"),
            ));
        }
        trace!(entry = %name, crc = expected, "Entry CRC verified");
    }

    debug!(entries = archive.len(), "Full CRC test passed");
    Ok(())
}

/// Offsets of Central Directory records in a raw archive buffer
///
/// Used by tests to corrupt a specific record.
#[cfg(test)]
pub(crate) fn central_record_offsets(bytes: &[u8]) -> Vec<usize> {
    bytes
        .windows(4)
        .enumerate()
        .filter(|(_, w)| *w == ZIP_CENTRAL_DIR_SIG)
        .map(|(i, _)| i)
        .collect()
}
