// Fixture builders shared by unit tests

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeZone};
use filetime::FileTime;
use rusqlite::Connection;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

enum FixtureKind {
    Deflated,
    Stored,
    Directory,
}

pub(crate) struct ZipFixture<'a> {
    name: &'a str,
    data: &'a [u8],
    kind: FixtureKind,
}

impl<'a> ZipFixture<'a> {
    pub(crate) fn bytes(name: &'a str, data: &'a [u8]) -> Self {
        Self { name, data, kind: FixtureKind::Deflated }
    }

    pub(crate) fn stored(name: &'a str, data: &'a [u8]) -> Self {
        Self { name, data, kind: FixtureKind::Stored }
    }

    pub(crate) fn dir(name: &'a str) -> Self {
        Self { name, data: &[], kind: FixtureKind::Directory }
    }
}

/// Write a ZIP archive with the given entries into `dir`
pub(crate) fn build_zip(dir: &Path, file_name: &str, entries: &[ZipFixture<'_>]) -> PathBuf {
    let path = dir.join(file_name);
    let mut writer = ZipWriter::new(File::create(&path).unwrap());

    for entry in entries {
        match entry.kind {
            FixtureKind::Directory => {
                writer.add_directory(entry.name, SimpleFileOptions::default()).unwrap();
            }
            FixtureKind::Deflated | FixtureKind::Stored => {
                let method = match entry.kind {
                    FixtureKind::Stored => CompressionMethod::Stored,
                    _ => CompressionMethod::Deflated,
                };
                let options = SimpleFileOptions::default().compression_method(method);
                writer.start_file(entry.name, options).unwrap();
                writer.write_all(entry.data).unwrap();
            }
        }
    }

    writer.finish().unwrap();
    path
}

/// Bytes of a SQLite database created by running `sql`
pub(crate) fn sqlite_bytes(sql: &str) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(sql).unwrap();
    drop(conn);
    std::fs::read(&path).unwrap()
}

/// Set a file's modification time to a local wall-clock time
pub(crate) fn set_mtime(path: &Path, local: NaiveDateTime) {
    let secs = Local.from_local_datetime(&local).earliest().unwrap().timestamp();
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

/// Flip one byte near the end of a stored entry's payload
///
/// The central directory and local header stay untouched, so only a reader
/// that verifies the CRC-32 at the end of the entry notices.
pub(crate) fn damage_stored_payload(path: &Path, payload: &[u8]) {
    let mut bytes = std::fs::read(path).unwrap();
    let start = bytes
        .windows(payload.len())
        .position(|w| w == payload)
        .expect("payload stored verbatim");
    bytes[start + payload.len() - 8] ^= 0xFF;
    std::fs::write(path, &bytes).unwrap();
}
