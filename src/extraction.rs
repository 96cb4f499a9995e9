//! Temporary materialization of archive entries
//!
//! SQLite needs a real file to open. An entry is decompressed to a unique
//! path under the temp root, handed to a callback, and deleted afterwards.
//! Deletion is owned by a guard, so it also runs when the callback fails or
//! panics. A failed deletion is reported, never fatal.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::archive::{with_entry_reader, ArchiveHandle};
use crate::common::BUFFER_SIZE;
use crate::error::{AnalysisError, AnalysisResult};

/// Callback value plus the outcome of deleting the temporary file
#[derive(Debug, Clone, Serialize)]
pub struct Materialized<T> {
    pub value: T,
    /// Set when the temporary file could not be deleted
    pub cleanup_warning: Option<String>,
}

/// Deletes the temporary file when dropped unless already removed
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn remove(mut self) -> io::Result<()> {
        self.armed = false;
        fs::remove_file(&self.path)
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "Temporary file not deleted");
            }
        }
    }
}

/// Strip path separators and characters unsafe in file names
fn sanitize_component(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let mut sanitized = String::with_capacity(base.len());
    for c in base.chars() {
        match c {
            '\0'..='\x1f' | '\x7f' => continue,
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => sanitized.push('_'),
            _ => sanitized.push(c),
        }
    }
    let trimmed = sanitized.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        "entry".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Unique temporary path `<archive-stem>-<entry>-<uuid>.part`
pub fn temp_path_for(handle: &ArchiveHandle, entry: &str, temp_root: &Path) -> PathBuf {
    temp_root.join(format!(
        "{}-{}-{}.part",
        sanitize_component(&handle.stem()),
        sanitize_component(entry),
        Uuid::new_v4()
    ))
}

/// Decompress `entry` to a temporary file, run `f` on its path, then delete it
///
/// The file is created exclusively (`create_new`), so concurrent runs never
/// share a path. Errors from `f` are returned after the file is deleted.
pub fn with_materialized<T, F>(
    handle: &ArchiveHandle,
    entry: &str,
    temp_root: &Path,
    f: F,
) -> AnalysisResult<Materialized<T>>
where
    F: FnOnce(&Path) -> AnalysisResult<T>,
{
    fs::create_dir_all(temp_root)?;
    let path = temp_path_for(handle, entry, temp_root);
    let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    let guard = TempFileGuard::new(path.clone());

    let written = write_entry(handle, entry, file)?;
    debug!(entry, path = %path.display(), bytes = written, "Entry materialized");

    let result = f(&path);

    let cleanup_warning = match guard.remove() {
        Ok(()) => None,
        Err(e) => {
            let warning = AnalysisError::CleanupWarning(format!("{}: {}", path.display(), e));
            warn!(error = %warning, "Temporary file not deleted");
            Some(warning.to_string())
        }
    };

    result.map(|value| Materialized { value, cleanup_warning })
}

fn write_entry(handle: &ArchiveHandle, entry: &str, file: File) -> AnalysisResult<u64> {
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE.min(1024 * 1024), file);
    let written = with_entry_reader(handle, entry, |reader| Ok(io::copy(reader, &mut writer)?))?;
    writer.flush()?;
    Ok(written)
}
