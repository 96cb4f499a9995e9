//! Latest-date extraction from an embedded SQLite database
//!
//! Each tracked `(table, column)` pair is reduced by a single pushed-down
//! aggregate (`MIN`, `MAX`, non-null, total and distinct counts); rows are
//! never loaded into memory. One
//! failing table or column becomes a finding, never an error for the whole
//! database.

use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::{debug, warn};

use super::schema::{detect_schema_kind, SchemaCatalog, TableIndex};
use super::types::{DateExtractionResult, LatestDates, SchemaKind};
use crate::error::{AnalysisError, AnalysisResult};
use crate::findings::{Finding, FindingKind};
use crate::sync::dates::{from_julian_day, from_unix_integer, parse_datetime_text};

/// Trailing window counted as recent activity before each column maximum
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Stored text layout used for the recent-rows cutoff comparison
const CUTOFF_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of inspecting one database file
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseExtraction {
    pub schema_kind: SchemaKind,
    pub table_count: usize,
    pub latest_dates: LatestDates,
    pub findings: Vec<Finding>,
}

/// Open a database file read-only
pub fn open_read_only(path: &Path) -> AnalysisResult<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Detect the schema kind and extract every tracked column of a database
///
/// Fails only if the file cannot be opened or is not a SQLite database; the
/// caller folds that into a finding.
pub fn inspect_database(path: &Path, catalog: &SchemaCatalog) -> AnalysisResult<DatabaseExtraction> {
    let conn = open_read_only(path)?;
    let (schema_kind, tables) = detect_schema_kind(&conn, catalog)?;

    let mut findings = Vec::new();
    let latest_dates = match extract_from_connection(&conn, &tables, schema_kind, catalog, &mut findings) {
        Ok(dates) => dates,
        Err(err) => {
            findings.extend(Finding::from_error(&err));
            LatestDates::new()
        }
    };

    Ok(DatabaseExtraction {
        schema_kind,
        table_count: tables.len(),
        latest_dates,
        findings,
    })
}

/// Extract latest dates for a known schema kind
///
/// `GenericUnknown` yields `SchemaMismatch`. Missing tables or columns and
/// failed queries produce absent results plus findings.
pub fn extract_latest_dates(
    path: &Path,
    kind: SchemaKind,
    catalog: &SchemaCatalog,
) -> AnalysisResult<(LatestDates, Vec<Finding>)> {
    let conn = open_read_only(path)?;
    let tables = TableIndex::load(&conn)?;
    let mut findings = Vec::new();
    let dates = extract_from_connection(&conn, &tables, kind, catalog, &mut findings)?;
    Ok((dates, findings))
}

fn extract_from_connection(
    conn: &Connection,
    tables: &TableIndex,
    kind: SchemaKind,
    catalog: &SchemaCatalog,
    findings: &mut Vec<Finding>,
) -> AnalysisResult<LatestDates> {
    let definition = match (kind, catalog.definition(kind)) {
        (SchemaKind::GenericUnknown, _) | (_, None) => return Err(AnalysisError::SchemaMismatch),
        (_, Some(def)) => def,
    };

    let mut dates = LatestDates::new();
    for tracked in &definition.tables {
        let Some(table) = tables.resolve(&tracked.table) else {
            debug!(table = %tracked.table, "Tracked table not present");
            findings.push(
                Finding::info(FindingKind::TableMissing, format!("Table {} not present", tracked.table))
                    .with_subject(tracked.table.clone()),
            );
            for column in &tracked.date_columns {
                dates.insert(DateExtractionResult::absent(&tracked.table, column));
            }
            continue;
        };

        let columns = match table_columns(conn, table) {
            Ok(columns) => columns,
            Err(err) => {
                warn!(table, error = %err, "Could not read table columns");
                findings.extend(Finding::from_error(&AnalysisError::QueryError {
                    table: tracked.table.clone(),
                    column: None,
                    reason: err.to_string(),
                }));
                for column in &tracked.date_columns {
                    dates.insert(DateExtractionResult::absent(&tracked.table, column));
                }
                continue;
            }
        };

        for column_name in &tracked.date_columns {
            let resolved = columns.iter().find(|c| c.eq_ignore_ascii_case(column_name));
            let result = match resolved {
                None => Err(AnalysisError::QueryError {
                    table: tracked.table.clone(),
                    column: Some(column_name.clone()),
                    reason: "column not present".to_string(),
                }),
                Some(column) => aggregate_column(conn, table, column, findings).map_err(|e| {
                    AnalysisError::QueryError {
                        table: tracked.table.clone(),
                        column: Some(column_name.clone()),
                        reason: e.to_string(),
                    }
                }),
            };

            match result {
                Ok(mut value) => {
                    value.table = tracked.table.clone();
                    value.column = column_name.clone();
                    dates.insert(value);
                }
                Err(err) => {
                    debug!(error = %err, "Column extraction failed");
                    findings.extend(Finding::from_error(&err));
                    dates.insert(DateExtractionResult::absent(&tracked.table, column_name));
                }
            }
        }
    }

    Ok(dates)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Run the aggregate for one column
fn aggregate_column(
    conn: &Connection,
    table: &str,
    column: &str,
    findings: &mut Vec<Finding>,
) -> rusqlite::Result<DateExtractionResult> {
    let sql = format!(
        "SELECT MIN({col}), MAX({col}), COUNT({col}), COUNT(*), COUNT(DISTINCT {col}) FROM {tbl}",
        col = quote_ident(column),
        tbl = quote_ident(table)
    );
    let (min, max, non_null, total, distinct) = conn.query_row(&sql, [], |row| {
        Ok((
            row.get::<_, Value>(0)?,
            row.get::<_, Value>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;
    let non_null = non_null.max(0) as u64;
    let total = total.max(0) as u64;

    let raw_max = raw_text(&max);
    let max_value = value_to_datetime(&max);
    if max_value.is_none() {
        if let Some(raw) = &raw_max {
            findings.push(
                Finding::warning(
                    FindingKind::QueryError,
                    format!("Maximum value '{}' is not a recognizable date", raw),
                )
                .with_subject(format!("{}.{}", table, column)),
            );
        }
    }

    let recent_rows = match (&max, max_value) {
        (Value::Text(text), Some(latest)) if looks_iso(text) => {
            let cutoff = (latest - Duration::days(RECENT_WINDOW_DAYS)).format(CUTOFF_FORMAT).to_string();
            let sql = format!(
                "SELECT COUNT(*) FROM {tbl} WHERE {col} >= ?1",
                col = quote_ident(column),
                tbl = quote_ident(table)
            );
            conn.query_row(&sql, [cutoff], |row| row.get::<_, i64>(0))
                .ok()
                .map(|n| n.max(0) as u64)
        }
        _ => None,
    };

    let min_value = value_to_datetime(&min);
    let span_days = match (min_value, max_value) {
        (Some(min), Some(max)) => Some((max - min).num_days()),
        _ => None,
    };

    Ok(DateExtractionResult {
        table: table.to_string(),
        column: column.to_string(),
        max_value,
        raw_max,
        min_value,
        row_count: Some(total),
        non_null_count: Some(non_null),
        distinct_count: Some(distinct.max(0) as u64),
        null_percentage: Some(DateExtractionResult::null_percentage_of(non_null, total)),
        span_days,
        recent_rows,
    })
}

/// Text layouts that sort lexically in date order
fn looks_iso(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 10 && bytes[..4].iter().all(u8::is_ascii_digit) && bytes[4] == b'-' && bytes[7] == b'-'
}

fn raw_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Text(s) => Some(s.clone()),
    }
}

/// Interpret a stored maximum as a date/time
///
/// Integers shaped like `YYYYMMDD` are calendar dates, other integers are
/// Unix epochs. Reals are Julian day numbers.
pub fn value_to_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Text(s) => parse_datetime_text(s),
        Value::Integer(i) if (19_000_101..=21_001_231).contains(i) => parse_datetime_text(&i.to_string()),
        Value::Integer(i) => from_unix_integer(*i),
        Value::Real(r) => from_julian_day(*r),
        Value::Null | Value::Blob(_) => None,
    }
}
