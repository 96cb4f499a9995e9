//! Backup archive reading (ZIP)
//!
//! Opening an archive verifies its structure and summarizes it into an
//! [`ArchiveHandle`]. Entry payloads are only ever streamed: callers either
//! read a bounded prefix or get a scoped reader that is closed when the
//! callback returns.
//!
//! ## ZIP Format
//! - Layout: [Local Headers][Data][Central Directory][EOCD]
//! - Metadata authority: Central Directory (not Local File Headers)
//! - Signatures: PK\x03\x04 (Local), PK\x01\x02 (Central), PK\x05\x06 (EOCD)
//!
//! ## Module Structure
//! ```text
//! archive/
//! ├── mod.rs        - open(), entry readers
//! ├── types.rs      - ArchiveHandle, ArchiveEntry, ReaderOptions
//! ├── detection.rs  - Entry heuristics, filename label
//! └── zip.rs        - Quick and strict integrity checks
//! ```

pub mod detection;
pub mod types;
pub mod zip;

pub use detection::{classify_entry, database_label_from_filename, is_likely_database, DetectionConfig};
pub use types::{ArchiveDigest, ArchiveEntry, ArchiveHandle, DatabaseLabel, IntegrityStatus, ReaderOptions};

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};
use filetime::FileTime;
use tracing::{debug, info, instrument, warn};
use ::zip::result::ZipError;
use ::zip::ZipArchive;

use crate::common::hash_file;
use crate::common::magic::extension_of;
use crate::error::{AnalysisError, AnalysisResult};
use crate::sync::date_from_filename;

/// Filesystem modification time as local wall-clock time
fn modified_time(metadata: &fs::Metadata) -> Option<NaiveDateTime> {
    let mtime = FileTime::from_last_modification_time(metadata);
    DateTime::from_timestamp(mtime.unix_seconds(), mtime.nanoseconds())
        .map(|utc| utc.with_timezone(&Local).naive_local())
}

/// Open an archive, verify its integrity and summarize its entries
#[instrument(skip(path, options, detection), fields(path = %path.display()))]
pub fn open(path: &Path, options: &ReaderOptions, detection: &DetectionConfig) -> AnalysisResult<ArchiveHandle> {
    if !path.exists() {
        return Err(AnalysisError::NotFound(path.display().to_string()));
    }
    let path = fs::canonicalize(path)?;
    let metadata = fs::metadata(&path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut archive = ZipArchive::new(File::open(&path)?)?;
    let mut raw = File::open(&path)?;
    zip::verify_directory(&mut archive, &mut raw)?;
    if options.strict_crc {
        zip::verify_full_crc(&mut archive)?;
    }

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let size = entry.size();
        let compressed_size = entry.compressed_size();
        entries.push(ArchiveEntry {
            compression_ratio: ArchiveEntry::compression_ratio_of(size, compressed_size),
            crc32: entry.crc32(),
            extension: extension_of(&name),
            is_likely_database: is_likely_database(&name, size, detection),
            name,
            size,
            compressed_size,
        });
    }
    entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));

    let uncompressed_size: u64 = entries.iter().map(|e| e.size).sum();
    let compressed_size: u64 = entries.iter().map(|e| e.compressed_size).sum();

    let digest = match options.digest {
        Some(algorithm) => Some(ArchiveDigest {
            algorithm,
            value: hash_file(&path, algorithm)?,
        }),
        None => None,
    };

    let handle = ArchiveHandle {
        total_size: metadata.len(),
        uncompressed_size,
        entry_count: entries.len(),
        integrity: IntegrityStatus::Intact,
        filename_date: date_from_filename(&file_name),
        modified: modified_time(&metadata),
        label: database_label_from_filename(&file_name),
        compression_ratio: ArchiveEntry::compression_ratio_of(uncompressed_size, compressed_size),
        digest,
        entries,
        file_name,
        path,
    };

    info!(
        archive = %handle.file_name,
        entries = handle.entry_count,
        size = handle.total_size,
        strict = options.strict_crc,
        "Archive opened"
    );
    Ok(handle)
}

/// Error from locating an entry for reading
fn entry_open_error(handle: &ArchiveHandle, name: &str, err: ZipError) -> AnalysisError {
    match err {
        ZipError::FileNotFound => AnalysisError::NotFound(format!("{}!{}", handle.file_name, name)),
        ZipError::UnsupportedArchive(reason) => AnalysisError::UnsupportedEntry {
            entry: name.to_string(),
            reason: reason.to_string(),
        },
        other => match AnalysisError::from(other) {
            AnalysisError::CorruptArchive { reason, .. } => AnalysisError::CorruptArchive {
                entry: Some(name.to_string()),
                reason,
            },
            err => err,
        },
    }
}

/// Error from reading an entry's payload
///
/// The zip reader reports a CRC-32 mismatch at the end of the entry, and a
/// damaged deflate stream, as `InvalidData`.
fn entry_read_error(name: &str, err: AnalysisError) -> AnalysisError {
    match err {
        AnalysisError::Io(e) if e.kind() == io::ErrorKind::InvalidData => {
            warn!(entry = name, error = %e, "Entry payload damaged");
            AnalysisError::CorruptArchive {
                entry: Some(name.to_string()),
                reason: e.to_string(),
            }
        }
        other => other,
    }
}

/// Run `f` with a streaming reader over one entry
///
/// The archive is reopened for the duration of the call and closed when `f`
/// returns. A checksum or stream failure seen by `f` comes back as
/// `CorruptArchive` naming the entry.
pub fn with_entry_reader<T, F>(handle: &ArchiveHandle, name: &str, f: F) -> AnalysisResult<T>
where
    F: FnOnce(&mut dyn Read) -> AnalysisResult<T>,
{
    let mut archive = ZipArchive::new(File::open(&handle.path)?)?;
    let mut entry = archive
        .by_name(name)
        .map_err(|e| entry_open_error(handle, name, e))?;
    f(&mut entry).map_err(|e| entry_read_error(name, e))
}

/// Read at most `n` bytes from the start of an entry
pub fn read_entry_prefix(handle: &ArchiveHandle, name: &str, n: usize) -> AnalysisResult<Vec<u8>> {
    with_entry_reader(handle, name, |reader| {
        let mut buf = Vec::with_capacity(n);
        reader.take(n as u64).read_to_end(&mut buf)?;
        debug!(entry = name, bytes = buf.len(), "Entry prefix read");
        Ok(buf)
    })
}

/// Read the first `n` bytes of every listed entry with one archive open
///
/// Results follow [`ArchiveHandle::list_entries`] order. A failure on one
/// entry (unsupported compression, damaged stream) is returned in its slot.
pub fn read_entry_prefixes(handle: &ArchiveHandle, n: usize) -> AnalysisResult<Vec<AnalysisResult<Vec<u8>>>> {
    let mut archive = ZipArchive::new(File::open(&handle.path)?)?;
    let prefixes = handle
        .list_entries()
        .iter()
        .map(|entry| -> AnalysisResult<Vec<u8>> {
            let mut file = archive
                .by_name(&entry.name)
                .map_err(|e| entry_open_error(handle, &entry.name, e))?;
            let mut buf = Vec::with_capacity(n.min(entry.size as usize));
            file.by_ref()
                .take(n as u64)
                .read_to_end(&mut buf)
                .map_err(|e| entry_read_error(&entry.name, e.into()))?;
            Ok(buf)
        })
        .collect();
    Ok(prefixes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DigestAlgorithm;
    use crate::test_support::{build_zip, damage_stored_payload, ZipFixture};
    use tempfile::TempDir;

    fn open_default(path: &Path) -> AnalysisResult<ArchiveHandle> {
        open(path, &ReaderOptions::default(), &DetectionConfig::default())
    }

    #[test]
    fn test_open_summarizes_entries() {
        let dir = TempDir::new().unwrap();
        let path = build_zip(
            dir.path(),
            "BackupStaging 2025-10-04 11;33;53.zip",
            &[
                ZipFixture::dir("nested/"),
                ZipFixture::bytes("b.txt", b"small"),
                ZipFixture::bytes("nested/staging.db", &vec![1u8; 8192]),
                ZipFixture::bytes("a.txt", b"small"),
            ],
        );

        let handle = open_default(&path).unwrap();
        let names: Vec<_> = handle.list_entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["nested/staging.db", "a.txt", "b.txt"]);
        assert_eq!(handle.entry_count, 3);
        assert_eq!(handle.integrity, IntegrityStatus::Intact);
        assert_eq!(handle.label, Some(DatabaseLabel::BackupStaging));
        assert!(handle.filename_date.is_some());
        assert!(handle.modified.is_some());
        assert!(handle.entry("nested/staging.db").unwrap().is_likely_database);
        assert!(!handle.entry("a.txt").unwrap().is_likely_database);

        let compressed: u64 = handle.list_entries().iter().map(|e| e.compressed_size).sum();
        assert!(compressed <= handle.total_size);
        assert_eq!(handle.uncompressed_size, 8192 + 10);
        assert!(handle.path.is_absolute());
    }

    #[test]
    fn test_missing_archive_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = open_default(&dir.path().join("absent.zip")).unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound(_)));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.zip");
        std::fs::write(&path, vec![0x5Au8; 1024]).unwrap();
        assert!(matches!(open_default(&path), Err(AnalysisError::CorruptArchive { .. })));
    }

    #[test]
    fn test_empty_archive_opens() {
        let dir = TempDir::new().unwrap();
        let path = build_zip(dir.path(), "empty.zip", &[]);
        let handle = open_default(&path).unwrap();
        assert!(handle.is_empty());
        assert_eq!(handle.compression_ratio, 0.0);
    }

    #[test]
    fn test_digest_on_request() {
        let dir = TempDir::new().unwrap();
        let path = build_zip(dir.path(), "d.zip", &[ZipFixture::bytes("a.txt", b"abc")]);
        let options = ReaderOptions {
            digest: Some(DigestAlgorithm::Sha256),
            ..ReaderOptions::default()
        };
        let handle = open(&path, &options, &DetectionConfig::default()).unwrap();
        let digest = handle.digest.unwrap();
        assert_eq!(digest.value, hash_file(&path, DigestAlgorithm::Sha256).unwrap());
        assert_eq!(digest.value.len(), 64);
    }

    #[test]
    fn test_prefix_and_stream() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let path = build_zip(dir.path(), "s.zip", &[ZipFixture::bytes("data.bin", &data)]);
        let handle = open_default(&path).unwrap();

        let prefix = read_entry_prefix(&handle, "data.bin", 16).unwrap();
        assert_eq!(prefix, &data[..16]);

        let total = with_entry_reader(&handle, "data.bin", |reader| {
            let mut sink = Vec::new();
            reader.read_to_end(&mut sink)?;
            Ok(sink.len())
        })
        .unwrap();
        assert_eq!(total, data.len());

        assert!(matches!(
            read_entry_prefix(&handle, "missing.bin", 16),
            Err(AnalysisError::NotFound(_))
        ));
    }

    #[test]
    fn test_prefixes_follow_listing_order() {
        let dir = TempDir::new().unwrap();
        let path = build_zip(
            dir.path(),
            "p.zip",
            &[ZipFixture::bytes("small.txt", b"hi"), ZipFixture::stored("big.db", &[9u8; 64])],
        );
        let handle = open_default(&path).unwrap();
        let prefixes = read_entry_prefixes(&handle, 8).unwrap();
        assert_eq!(prefixes.len(), 2);
        assert_eq!(prefixes[0].as_ref().unwrap(), &vec![9u8; 8]);
        assert_eq!(prefixes[1].as_ref().unwrap(), b"hi");
    }

    #[test]
    fn test_damaged_payload_is_corrupt_entry() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 199) as u8).collect();
        let path = build_zip(
            dir.path(),
            "d.zip",
            &[ZipFixture::stored("data.db", &data), ZipFixture::bytes("note.txt", b"ok")],
        );
        damage_stored_payload(&path, &data);

        // Central directory and local headers still agree
        let handle = open_default(&path).unwrap();
        assert_eq!(handle.integrity, IntegrityStatus::Intact);

        // A short prefix stops before the checksum is verified
        assert_eq!(read_entry_prefix(&handle, "data.db", 64).unwrap(), &data[..64]);

        let err = with_entry_reader(&handle, "data.db", |reader| {
            let mut sink = Vec::new();
            reader.read_to_end(&mut sink)?;
            Ok(sink.len())
        })
        .unwrap_err();
        match err {
            AnalysisError::CorruptArchive { entry, .. } => assert_eq!(entry.as_deref(), Some("data.db")),
            other => panic!("unexpected error: {other}"),
        }

        let prefixes = read_entry_prefixes(&handle, data.len() + 1).unwrap();
        assert!(matches!(
            &prefixes[0],
            Err(AnalysisError::CorruptArchive { entry: Some(name), .. }) if name == "data.db"
        ));
        assert_eq!(prefixes[1].as_ref().unwrap(), b"ok");
    }
}
