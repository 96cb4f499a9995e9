//! Per-archive analysis run
//!
//! A run moves through
//! `Opened -> Classified -> {HeaderAnalyzed | DatesExtracted | SkippedUnknown} -> Reconciled -> Finalized`
//! and always ends in exactly one [`AnalysisOutcome`]. Errors for which
//! [`AnalysisError::is_fatal`] holds (missing archive, corrupt directory or
//! entry payload, cancellation, archive I/O) produce `Failed`; everything
//! else is folded into findings of a `Success`.
//!
//! Runs share no state: the result value is the only thing a run leaves
//! behind.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::archive::{self, classify_entry, ArchiveEntry, ArchiveHandle, IntegrityStatus};
use crate::common::{deep_inspect, FormatClassification, FormatKind};
use crate::config::Config;
use crate::database::{inspect_database, DatabaseExtraction, LatestDates, SchemaKind};
use crate::error::{AnalysisError, AnalysisResult};
use crate::extraction::{with_materialized, Materialized};
use crate::findings::{Finding, FindingKind, Severity};
use crate::logging;
use crate::sync::{reconcile, Clock, SyncHealthReport};
use crate::tape::{analyze_header, ProprietaryHeaderInfo};

// =============================================================================
// Run State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Opened,
    Classified,
    HeaderAnalyzed,
    DatesExtracted,
    SkippedUnknown,
    Reconciled,
    Finalized,
}

/// Ordered record of the states a run passed through
#[derive(Debug, Clone, Default)]
struct StateTrail {
    states: Vec<RunState>,
}

impl StateTrail {
    fn advance(&mut self, state: RunState) {
        if !self.states.contains(&state) {
            debug!(?state, "Run state");
            self.states.push(state);
        }
    }

    fn last(&self) -> Option<RunState> {
        self.states.last().copied()
    }
}

/// Cooperative cancellation flag, checked between stages and once an entry
/// is materialized
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> AnalysisResult<()> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// =============================================================================
// Outcome Types
// =============================================================================

/// Per-entry result of classification and the stage that handled it
#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub name: String,
    pub size: u64,
    pub classification: FormatClassification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<ProprietaryHeaderInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_kind: Option<SchemaKind>,
}

impl EntryReport {
    fn new(entry: &ArchiveEntry, classification: FormatClassification) -> Self {
        Self {
            name: entry.name.clone(),
            size: entry.size,
            classification,
            header: None,
            schema_kind: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveAnalysis {
    pub archive: ArchiveHandle,
    pub entries: Vec<EntryReport>,
    /// Schema of the first recognized embedded database
    pub schema_kind: Option<SchemaKind>,
    /// Present only when at least one embedded database was read
    pub latest_dates: Option<LatestDates>,
    pub sync: SyncHealthReport,
    pub findings: Vec<Finding>,
    pub states: Vec<RunState>,
}

impl ArchiveAnalysis {
    /// First decoded proprietary header, if any
    pub fn header(&self) -> Option<&ProprietaryHeaderInfo> {
        self.entries.iter().find_map(|e| e.header.as_ref())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedAnalysis {
    pub path: PathBuf,
    /// Error kind, e.g. `CorruptArchive`
    pub reason: String,
    pub message: String,
    /// Entry named by a `CorruptArchive` error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    pub integrity: IntegrityStatus,
    /// Last state reached before the failure
    pub last_state: Option<RunState>,
}

impl FailedAnalysis {
    fn from_error(path: &Path, err: &AnalysisError, last_state: Option<RunState>) -> Self {
        let (entry, integrity) = match err {
            AnalysisError::CorruptArchive { entry, .. } => (entry.clone(), IntegrityStatus::Corrupt),
            _ => (None, IntegrityStatus::Unknown),
        };
        Self {
            path: path.to_path_buf(),
            reason: err.kind_name().to_string(),
            message: err.to_string(),
            entry,
            integrity,
            last_state,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum AnalysisOutcome {
    Success(ArchiveAnalysis),
    Failed(FailedAnalysis),
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success(_))
    }

    pub fn path(&self) -> &Path {
        match self {
            AnalysisOutcome::Success(a) => &a.archive.path,
            AnalysisOutcome::Failed(f) => &f.path,
        }
    }

    pub fn analysis(&self) -> Option<&ArchiveAnalysis> {
        match self {
            AnalysisOutcome::Success(a) => Some(a),
            AnalysisOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailedAnalysis> {
        match self {
            AnalysisOutcome::Success(_) => None,
            AnalysisOutcome::Failed(f) => Some(f),
        }
    }
}

// =============================================================================
// Run
// =============================================================================

/// Analyze one archive end to end
pub fn analyze_archive(path: &Path, config: &Config, clock: &dyn Clock, cancel: &CancelToken) -> AnalysisOutcome {
    let span = info_span!("analyze", archive = %path.display());
    let _enter = span.enter();

    let mut trail = StateTrail::default();
    match run(path, config, clock, cancel, &mut trail) {
        Ok(analysis) => {
            info!(
                health = %analysis.sync.classification,
                findings = analysis.findings.len(),
                "Analysis finished"
            );
            AnalysisOutcome::Success(analysis)
        }
        Err(err) => {
            warn!(error = %err, "Analysis failed");
            AnalysisOutcome::Failed(FailedAnalysis::from_error(path, &err, trail.last()))
        }
    }
}

/// Finding for a stage failure on one entry
fn entry_finding(entry: &str, err: &AnalysisError) -> Finding {
    Finding::from_error(err)
        .unwrap_or_else(|| Finding::new(FindingKind::UnreadableEntry, Severity::Error, err.to_string()))
        .with_subject(entry)
}

/// Fold a stage failure on one entry into the findings, or abort the run
fn record_entry_error(entry: &str, err: AnalysisError, findings: &mut Vec<Finding>) -> AnalysisResult<()> {
    if err.is_fatal() {
        return Err(err);
    }
    findings.push(entry_finding(entry, &err));
    Ok(())
}

fn run(
    path: &Path,
    config: &Config,
    clock: &dyn Clock,
    cancel: &CancelToken,
    trail: &mut StateTrail,
) -> AnalysisResult<ArchiveAnalysis> {
    cancel.check()?;
    let handle = archive::open(path, &config.reader, &config.detection)?;
    trail.advance(RunState::Opened);

    let mut findings = Vec::new();
    if handle.is_empty() {
        findings.extend(Finding::from_error(&AnalysisError::EmptyArchive));
    }

    cancel.check()?;
    let mut classified = classify_entries(&handle, config, &mut findings)?;
    trail.advance(RunState::Classified);

    let mut latest: Option<LatestDates> = None;
    let mut schema_kind = None;

    for (report, prefix) in classified.iter_mut() {
        cancel.check()?;
        let Some(entry) = handle.entry(&report.name) else { continue };
        match report.classification.kind {
            FormatKind::ProprietaryTape => {
                analyze_tape_entry(report, entry, prefix, config, &mut findings);
                trail.advance(RunState::HeaderAnalyzed);
            }
            FormatKind::Sqlite => {
                match extract_entry_dates(&handle, entry, config, cancel) {
                    Ok(materialized) => {
                        let extraction = materialized.value;
                        report.schema_kind = Some(extraction.schema_kind);
                        if schema_kind.is_none() || schema_kind == Some(SchemaKind::GenericUnknown) {
                            schema_kind = Some(extraction.schema_kind);
                        }
                        findings.extend(extraction.findings.into_iter().map(|f| {
                            if f.subject.is_some() {
                                f
                            } else {
                                f.with_subject(entry.name.clone())
                            }
                        }));
                        if let Some(warning) = materialized.cleanup_warning {
                            findings.push(
                                Finding::warning(FindingKind::CleanupWarning, warning).with_subject(entry.name.clone()),
                            );
                        }
                        latest
                            .get_or_insert_with(LatestDates::new)
                            .merge(extraction.latest_dates);
                    }
                    Err(err) => {
                        warn!(entry = %entry.name, error = %err, "Embedded database not readable");
                        record_entry_error(&entry.name, err, &mut findings)?;
                    }
                }
                trail.advance(RunState::DatesExtracted);
            }
            FormatKind::UnknownBinary => {
                inspect_unknown_entry(&handle, report, entry, config, &mut findings)?;
                if report.header.is_some() {
                    trail.advance(RunState::HeaderAnalyzed);
                } else {
                    trail.advance(RunState::SkippedUnknown);
                }
            }
            FormatKind::NotADatabase => {}
        }
    }
    let entries: Vec<EntryReport> = classified.into_iter().map(|(report, _)| report).collect();
    if !entries.iter().any(|e| e.classification.kind != FormatKind::NotADatabase) {
        trail.advance(RunState::SkippedUnknown);
    }

    cancel.check()?;
    let sync = reconcile(
        handle.filename_date,
        handle.modified,
        latest.as_ref(),
        clock.now(),
        &config.thresholds,
    );
    trail.advance(RunState::Reconciled);
    trail.advance(RunState::Finalized);

    Ok(ArchiveAnalysis {
        archive: handle,
        entries,
        schema_kind,
        latest_dates: latest,
        sync,
        findings,
        states: trail.states.clone(),
    })
}

/// Read every entry prefix once and classify it
///
/// The prefix is returned alongside the report for tape entries only; the
/// header analyzer needs more than the recorded signature bytes.
fn classify_entries(
    handle: &ArchiveHandle,
    config: &Config,
    findings: &mut Vec<Finding>,
) -> AnalysisResult<Vec<(EntryReport, Vec<u8>)>> {
    let prefixes = archive::read_entry_prefixes(handle, config.detection.header_probe_bytes)?;
    let mut reports = Vec::with_capacity(prefixes.len());

    for (entry, prefix) in handle.list_entries().iter().zip(prefixes) {
        let header = match prefix {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(entry = %entry.name, error = %err, "Entry prefix not readable");
                record_entry_error(&entry.name, err, findings)?;
                Vec::new()
            }
        };
        let classification = classify_entry(entry, &header, &config.detection);
        let probe = if classification.kind == FormatKind::ProprietaryTape {
            header
        } else {
            Vec::new()
        };
        reports.push((EntryReport::new(entry, classification), probe));
    }

    if logging::is_debug_enabled() {
        let kinds: Vec<String> = reports
            .iter()
            .map(|(r, _)| format!("{}={}", r.name, r.classification.kind))
            .collect();
        debug!(entries = ?kinds, "Entries classified");
    }
    Ok(reports)
}

/// Materialize one embedded database and read its dates
///
/// Cancellation is checked inside the callback, so a cancelled run still
/// removes the temporary copy before `Cancelled` is returned.
fn extract_entry_dates(
    handle: &ArchiveHandle,
    entry: &ArchiveEntry,
    config: &Config,
    cancel: &CancelToken,
) -> AnalysisResult<Materialized<DatabaseExtraction>> {
    let temp_root = config.workers.temp_root();
    with_materialized(handle, &entry.name, &temp_root, |db| {
        cancel.check()?;
        let extraction = inspect_database(db, &config.schemas)?;
        cancel.check()?;
        Ok(extraction)
    })
}

fn analyze_tape_entry(
    report: &mut EntryReport,
    entry: &ArchiveEntry,
    probe: &[u8],
    config: &Config,
    findings: &mut Vec<Finding>,
) {
    match analyze_header(probe, entry.size, &entry.name, &config.header) {
        Ok(info) => {
            findings.extend(info.notes.iter().map(|note| {
                Finding::info(FindingKind::HeaderNote, note.clone()).with_subject(entry.name.clone())
            }));
            report.header = Some(info);
        }
        Err(err) => findings.push(entry_finding(&entry.name, &err)),
    }
}

/// Scan a larger probe of an unidentified payload for embedded markers
fn inspect_unknown_entry(
    handle: &ArchiveHandle,
    report: &mut EntryReport,
    entry: &ArchiveEntry,
    config: &Config,
    findings: &mut Vec<Finding>,
) -> AnalysisResult<()> {
    let probe = match archive::read_entry_prefix(handle, &entry.name, config.detection.deep_probe_bytes) {
        Ok(probe) => probe,
        Err(err) => return record_entry_error(&entry.name, err, findings),
    };

    let inspection = deep_inspect(&probe);
    if inspection.is_empty() {
        debug!(entry = %entry.name, "No embedded markers found");
        return Ok(());
    }
    findings.extend(
        inspection
            .notes()
            .into_iter()
            .map(|note| Finding::info(FindingKind::DeepInspection, note).with_subject(entry.name.clone())),
    );

    if let Some(&offset) = inspection.tape_block_offsets.first() {
        let size = entry.size.saturating_sub(offset as u64);
        match analyze_header(&probe[offset..], size, &entry.name, &config.header) {
            Ok(info) => report.header = Some(info),
            Err(err) => findings.push(entry_finding(&entry.name, &err)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{FixedClock, SyncHealth};
    use crate::archive::{DetectionConfig, ReaderOptions};
    use crate::test_support::{build_zip, damage_stored_payload, set_mtime, sqlite_bytes, ZipFixture};
    use chrono::NaiveDateTime;
    use tempfile::TempDir;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn config_with_temp(temp: &Path) -> Config {
        let mut config = Config::default();
        config.workers.temp_dir = Some(temp.to_path_buf());
        config
    }

    fn staging_archive(dir: &Path, update_date: &str) -> PathBuf {
        let db = sqlite_bytes(&format!(
            "CREATE TABLE GWSCANNER (ID INTEGER, UPDATE_DATE TEXT);
             INSERT INTO GWSCANNER VALUES (1, '2025-09-01 00:00:00');
             INSERT INTO GWSCANNER VALUES (2, '{update_date}');"
        ));
        let path = build_zip(
            dir,
            "staging_2025-10-04.zip",
            &[ZipFixture::bytes("staging.db", &db), ZipFixture::bytes("readme.txt", b"nightly")],
        );
        set_mtime(&path, dt("2025-10-04 12:00:00"));
        path
    }

    fn run_fixed(path: &Path, config: &Config, now: &str) -> AnalysisOutcome {
        analyze_archive(path, config, &FixedClock(dt(now)), &CancelToken::new())
    }

    #[test]
    fn test_recent_staging_archive_is_healthy() {
        let dir = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let path = staging_archive(dir.path(), "2025-10-04 11:00:00");

        let outcome = run_fixed(&path, &config_with_temp(temp.path()), "2025-10-05 09:00:00");
        let analysis = outcome.analysis().expect("success");

        assert_eq!(analysis.schema_kind, Some(SchemaKind::Staging));
        assert_eq!(analysis.sync.classification, SyncHealth::Healthy);
        assert_eq!(analysis.sync.age_hours, Some(22.0));
        assert_eq!(analysis.sync.threshold_hours, Some(24));
        let update = analysis.latest_dates.as_ref().unwrap().get("GWSCANNER", "UPDATE_DATE").unwrap();
        assert_eq!(update.max_value, Some(dt("2025-10-04 11:00:00")));
        assert!(analysis.states.contains(&RunState::DatesExtracted));
        assert_eq!(analysis.states.last(), Some(&RunState::Finalized));
    }

    #[test]
    fn test_stale_staging_archive_names_column() {
        let dir = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let path = staging_archive(dir.path(), "2025-09-20 00:00:00");

        let outcome = run_fixed(&path, &config_with_temp(temp.path()), "2025-10-05 09:00:00");
        let analysis = outcome.analysis().expect("success");

        assert_eq!(analysis.sync.classification, SyncHealth::Stale);
        assert!(analysis.sync.age_hours.unwrap() > 168.0);
        assert!(analysis
            .sync
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::LaggingColumn && f.subject.as_deref() == Some("GWSCANNER.UPDATE_DATE")));
    }

    #[test]
    fn test_tape_entry_without_timestamp_falls_back_to_file_dates() {
        let dir = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let mut tape = b"TAPE".to_vec();
        tape.extend_from_slice(&1u32.to_le_bytes());
        tape.extend_from_slice(&0u32.to_le_bytes());
        tape.extend_from_slice(&0u64.to_le_bytes());
        tape.extend_from_slice(&[0u8; 12]);
        tape.extend_from_slice(&[0x11u8; 4000]);
        let path = build_zip(
            dir.path(),
            "PlantwareP3 2025-10-04 11;33;53.zip",
            &[ZipFixture::bytes("PlantwareP3.bak", &tape)],
        );
        set_mtime(&path, dt("2025-10-04 11:40:00"));

        let outcome = run_fixed(&path, &config_with_temp(temp.path()), "2025-10-05 09:00:00");
        let analysis = outcome.analysis().expect("success");

        let header = analysis.header().expect("header decoded");
        assert_eq!(header.timestamp, None);
        assert_eq!(header.estimated_record_count, Some((tape.len() as u64 - 32) / 500));
        assert!(analysis.latest_dates.is_none());
        assert_ne!(analysis.sync.classification, SyncHealth::Unknown);
        assert!(analysis.states.contains(&RunState::HeaderAnalyzed));
    }

    #[test]
    fn test_corrupt_directory_fails_without_dates() {
        let dir = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let path = staging_archive(dir.path(), "2025-10-04 11:00:00");

        let mut bytes = std::fs::read(&path).unwrap();
        let offsets = archive::zip::central_record_offsets(&bytes);
        // Corrupt the CRC of the first central record (staging.db)
        bytes[offsets[0] + 16] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let outcome = run_fixed(&path, &config_with_temp(temp.path()), "2025-10-05 09:00:00");
        let failure = outcome.failure().expect("failed");
        assert_eq!(failure.reason, "CorruptArchive");
        assert_eq!(failure.entry.as_deref(), Some("staging.db"));
        assert_eq!(failure.integrity, IntegrityStatus::Corrupt);
        assert!(outcome.analysis().is_none());
    }

    #[test]
    fn test_missing_archive_fails() {
        let dir = TempDir::new().unwrap();
        let outcome = run_fixed(&dir.path().join("none.zip"), &Config::default(), "2025-10-05 09:00:00");
        assert_eq!(outcome.failure().unwrap().reason, "NotFound");
        assert_eq!(outcome.failure().unwrap().last_state, None);
    }

    #[test]
    fn test_runs_are_repeatable_and_leave_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let path = staging_archive(dir.path(), "2025-10-04 11:00:00");
        let config = config_with_temp(temp.path());

        let first = serde_json::to_value(run_fixed(&path, &config, "2025-10-05 09:00:00")).unwrap();
        let second = serde_json::to_value(run_fixed(&path, &config, "2025-10-05 09:00:00")).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_archive_is_a_finding() {
        let dir = TempDir::new().unwrap();
        let path = build_zip(dir.path(), "venus_2025-10-04.zip", &[]);
        let outcome = run_fixed(&path, &Config::default(), "2025-10-05 09:00:00");
        let analysis = outcome.analysis().expect("success");
        assert!(analysis.findings.iter().any(|f| f.kind == FindingKind::EmptyArchive));
        assert!(analysis.states.contains(&RunState::SkippedUnknown));
    }

    #[test]
    fn test_unrecognized_schema_is_a_finding() {
        let dir = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let db = sqlite_bytes("CREATE TABLE customers (id INTEGER);");
        let path = build_zip(dir.path(), "misc_2025-10-04.zip", &[ZipFixture::bytes("misc.db", &db)]);

        let outcome = run_fixed(&path, &config_with_temp(temp.path()), "2025-10-05 09:00:00");
        let analysis = outcome.analysis().expect("success");
        assert_eq!(analysis.schema_kind, Some(SchemaKind::GenericUnknown));
        assert!(analysis.findings.iter().any(|f| f.kind == FindingKind::SchemaMismatch));
    }

    #[test]
    fn test_cancelled_run_fails() {
        let dir = TempDir::new().unwrap();
        let path = staging_archive(dir.path(), "2025-10-04 11:00:00");
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = analyze_archive(&path, &Config::default(), &FixedClock(dt("2025-10-05 09:00:00")), &cancel);
        assert_eq!(outcome.failure().unwrap().reason, "Cancelled");
    }

    #[test]
    fn test_damaged_database_payload_fails_as_corrupt() {
        let dir = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let db = sqlite_bytes(
            "CREATE TABLE GWSCANNER (ID INTEGER, UPDATE_DATE TEXT);
             INSERT INTO GWSCANNER VALUES (1, '2025-10-04 11:00:00');",
        );
        let path = build_zip(
            dir.path(),
            "staging_2025-10-04.zip",
            &[ZipFixture::stored("staging.db", &db), ZipFixture::bytes("readme.txt", b"nightly")],
        );
        damage_stored_payload(&path, &db);

        let outcome = run_fixed(&path, &config_with_temp(temp.path()), "2025-10-05 09:00:00");
        let failure = outcome.failure().expect("failed");
        assert_eq!(failure.reason, "CorruptArchive");
        assert_eq!(failure.entry.as_deref(), Some("staging.db"));
        assert_eq!(failure.integrity, IntegrityStatus::Corrupt);
        assert_eq!(failure.last_state, Some(RunState::Classified));
        assert!(outcome.analysis().is_none());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_cancel_after_materialization_cleans_up() {
        let dir = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let db = sqlite_bytes("CREATE TABLE GWSCANNER (ID INTEGER, UPDATE_DATE TEXT);");
        let path = build_zip(
            dir.path(),
            "staging_2025-10-04.zip",
            &[ZipFixture::bytes("first.db", &db), ZipFixture::bytes("second.db", &db)],
        );
        let config = config_with_temp(temp.path());
        let handle = archive::open(&path, &ReaderOptions::default(), &DetectionConfig::default()).unwrap();
        let cancel = CancelToken::new();

        let first = handle.entry("first.db").unwrap();
        assert!(extract_entry_dates(&handle, first, &config, &cancel).is_ok());

        // Cancelled between the two databases: the second copy is written,
        // seen as cancelled inside the callback, then removed
        cancel.cancel();
        let second = handle.entry("second.db").unwrap();
        let result = extract_entry_dates(&handle, second, &config, &cancel);
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);

        let failure = FailedAnalysis::from_error(&path, &AnalysisError::Cancelled, Some(RunState::Classified));
        assert_eq!(failure.reason, "Cancelled");
        assert_eq!(failure.integrity, IntegrityStatus::Unknown);
    }
}
