//! Date synchronization analysis
//!
//! Reconciles the three date sources known for an archive:
//! - the date embedded in its filename
//! - its filesystem modification time
//! - the freshest value of every tracked database column
//!
//! Age is measured from the freshest database date when one exists (that is
//! what the data says), otherwise from the freshest filename/filesystem date.
//! Each column lagging the freshest known date by more than the warning
//! threshold is reported, which surfaces a single table that stopped updating
//! while the rest of the archive is current.

pub mod clock;
pub mod dates;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dates::date_from_filename;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::LatestDates;
use crate::findings::{Finding, FindingKind};

/// Staleness thresholds in hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub healthy_hours: u64,
    pub warning_hours: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            healthy_hours: 24,
            warning_hours: 168,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncHealth {
    Healthy,
    Warning,
    Stale,
    Unknown,
}

impl std::fmt::Display for SyncHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncHealth::Healthy => write!(f, "Healthy"),
            SyncHealth::Warning => write!(f, "Warning"),
            SyncHealth::Stale => write!(f, "Stale"),
            SyncHealth::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Which source the age was measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeBasis {
    Database,
    Filename,
    Filesystem,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncHealthReport {
    pub filename_date: Option<NaiveDateTime>,
    pub archive_modified: Option<NaiveDateTime>,
    pub database_freshest: Option<NaiveDateTime>,
    /// Max over every available source
    pub freshest_known: Option<NaiveDateTime>,
    pub age_basis: AgeBasis,
    pub age_hours: Option<f64>,
    pub classification: SyncHealth,
    /// Upper bound met (Healthy, Warning) or bound exceeded (Stale)
    pub threshold_hours: Option<u64>,
    pub evaluated_at: NaiveDateTime,
    pub findings: Vec<Finding>,
}

fn hours_between(later: NaiveDateTime, earlier: NaiveDateTime) -> f64 {
    let hours = (later - earlier).num_seconds() as f64 / 3600.0;
    (hours * 100.0).round() / 100.0
}

/// Reconcile candidate dates into a health report
pub fn reconcile(
    filename_date: Option<NaiveDateTime>,
    archive_modified: Option<NaiveDateTime>,
    latest_dates: Option<&LatestDates>,
    now: NaiveDateTime,
    thresholds: &Thresholds,
) -> SyncHealthReport {
    let database_freshest = latest_dates.and_then(LatestDates::freshest);
    let freshest_known = [filename_date, archive_modified, database_freshest]
        .into_iter()
        .flatten()
        .max();

    let (age_basis, basis_date) = match (database_freshest, filename_date, archive_modified) {
        (Some(db), _, _) => (AgeBasis::Database, Some(db)),
        (None, Some(name), Some(mtime)) if mtime > name => (AgeBasis::Filesystem, Some(mtime)),
        (None, Some(name), _) => (AgeBasis::Filename, Some(name)),
        (None, None, Some(mtime)) => (AgeBasis::Filesystem, Some(mtime)),
        (None, None, None) => (AgeBasis::None, None),
    };

    let mut findings = Vec::new();

    let age_hours = basis_date.map(|date| {
        let hours = hours_between(now, date);
        if hours < 0.0 {
            findings.push(Finding::warning(
                FindingKind::FutureDate,
                format!("Freshest date {date} is after the evaluation time {now}"),
            ));
            0.0
        } else {
            hours
        }
    });

    let (classification, threshold_hours) = match age_hours {
        None => {
            findings.push(Finding::warning(FindingKind::NoDates, "No date could be determined for this archive"));
            (SyncHealth::Unknown, None)
        }
        Some(age) if age <= thresholds.healthy_hours as f64 => (SyncHealth::Healthy, Some(thresholds.healthy_hours)),
        Some(age) if age <= thresholds.warning_hours as f64 => (SyncHealth::Warning, Some(thresholds.warning_hours)),
        Some(_) => (SyncHealth::Stale, Some(thresholds.warning_hours)),
    };

    if let (Some(reference), Some(dates)) = (freshest_known, latest_dates) {
        for column in dates.iter() {
            let Some(value) = column.max_value else { continue };
            let lag = hours_between(reference, value);
            if lag > thresholds.warning_hours as f64 {
                findings.push(
                    Finding::warning(
                        FindingKind::LaggingColumn,
                        format!(
                            "{} latest value {} is {:.1} days behind the freshest known date {}",
                            column.label(),
                            value,
                            lag / 24.0,
                            reference
                        ),
                    )
                    .with_subject(column.label()),
                );
            }
        }
    }

    debug!(
        classification = %classification,
        age_hours = ?age_hours,
        basis = ?age_basis,
        findings = findings.len(),
        "Date synchronization reconciled"
    );

    SyncHealthReport {
        filename_date,
        archive_modified,
        database_freshest,
        freshest_known,
        age_basis,
        age_hours,
        classification,
        threshold_hours,
        evaluated_at: now,
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DateExtractionResult;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn latest(columns: &[(&str, &str, Option<&str>)]) -> LatestDates {
        let mut dates = LatestDates::new();
        for (table, column, max) in columns {
            dates.insert(DateExtractionResult {
                max_value: max.map(dt),
                ..DateExtractionResult::absent(table, column)
            });
        }
        dates
    }

    #[test]
    fn test_staging_healthy() {
        let dates = latest(&[("GWSCANNER", "UPDATE_DATE", Some("2025-10-04 11:00:00"))]);
        let report = reconcile(
            Some(dt("2025-10-04 00:00:00")),
            None,
            Some(&dates),
            dt("2025-10-05 09:00:00"),
            &Thresholds::default(),
        );
        assert_eq!(report.classification, SyncHealth::Healthy);
        assert_eq!(report.age_basis, AgeBasis::Database);
        assert_eq!(report.age_hours, Some(22.0));
        assert_eq!(report.threshold_hours, Some(24));
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_staging_stale_names_column() {
        let dates = latest(&[("GWSCANNER", "UPDATE_DATE", Some("2025-09-20 00:00:00"))]);
        let report = reconcile(
            Some(dt("2025-10-04 00:00:00")),
            None,
            Some(&dates),
            dt("2025-10-05 09:00:00"),
            &Thresholds::default(),
        );
        assert_eq!(report.classification, SyncHealth::Stale);
        assert!(report.age_hours.unwrap() > 168.0);
        let lagging: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.kind == FindingKind::LaggingColumn)
            .collect();
        assert_eq!(lagging.len(), 1);
        assert_eq!(lagging[0].subject.as_deref(), Some("GWSCANNER.UPDATE_DATE"));
    }

    #[test]
    fn test_warning_band() {
        let report = reconcile(
            Some(dt("2025-10-01 00:00:00")),
            None,
            None,
            dt("2025-10-05 00:00:00"),
            &Thresholds::default(),
        );
        assert_eq!(report.classification, SyncHealth::Warning);
        assert_eq!(report.age_basis, AgeBasis::Filename);
        assert_eq!(report.age_hours, Some(96.0));
    }

    #[test]
    fn test_falls_back_to_newer_filesystem_date() {
        let report = reconcile(
            Some(dt("2025-10-01 00:00:00")),
            Some(dt("2025-10-04 12:00:00")),
            Some(&LatestDates::new()),
            dt("2025-10-05 00:00:00"),
            &Thresholds::default(),
        );
        assert_eq!(report.age_basis, AgeBasis::Filesystem);
        assert_eq!(report.classification, SyncHealth::Healthy);
    }

    #[test]
    fn test_no_dates_is_unknown() {
        let report = reconcile(None, None, None, dt("2025-10-05 00:00:00"), &Thresholds::default());
        assert_eq!(report.classification, SyncHealth::Unknown);
        assert_eq!(report.age_hours, None);
        assert_eq!(report.findings[0].kind, FindingKind::NoDates);
    }

    #[test]
    fn test_partial_staleness_while_healthy() {
        let dates = latest(&[
            ("Gwscannerdata", "TRANSDATE", Some("2025-10-05 08:00:00")),
            ("Ffbscannerdata", "TRANSDATE", Some("2025-08-01 00:00:00")),
            ("Ffbscannerdata", "INTEGRATETIME", None),
        ]);
        let report = reconcile(None, None, Some(&dates), dt("2025-10-05 09:00:00"), &Thresholds::default());
        assert_eq!(report.classification, SyncHealth::Healthy);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].subject.as_deref(), Some("Ffbscannerdata.TRANSDATE"));
    }

    #[test]
    fn test_future_date_clamps_age() {
        let report = reconcile(
            Some(dt("2025-10-06 00:00:00")),
            None,
            None,
            dt("2025-10-05 00:00:00"),
            &Thresholds::default(),
        );
        assert_eq!(report.age_hours, Some(0.0));
        assert_eq!(report.classification, SyncHealth::Healthy);
        assert_eq!(report.findings[0].kind, FindingKind::FutureDate);
    }
}
