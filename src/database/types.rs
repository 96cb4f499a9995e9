//! Type definitions for embedded database extraction

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Logical kind of an embedded database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaKind {
    Plantware,
    Venus,
    Staging,
    GenericUnknown,
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaKind::Plantware => write!(f, "Plantware"),
            SchemaKind::Venus => write!(f, "Venus"),
            SchemaKind::Staging => write!(f, "Staging"),
            SchemaKind::GenericUnknown => write!(f, "Unknown"),
        }
    }
}

/// Latest value and coverage statistics of one tracked date column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateExtractionResult {
    pub table: String,
    pub column: String,
    /// Maximum observed value; None if the table/column is absent or empty
    pub max_value: Option<NaiveDateTime>,
    /// Stored representation of the maximum
    pub raw_max: Option<String>,
    /// Minimum observed value
    pub min_value: Option<NaiveDateTime>,
    /// Total rows in the table
    pub row_count: Option<u64>,
    /// Rows with a non-null value in the column
    pub non_null_count: Option<u64>,
    pub distinct_count: Option<u64>,
    /// Share of rows with a null value, 0-100 rounded to two decimals
    pub null_percentage: Option<f64>,
    /// Whole days between minimum and maximum
    pub span_days: Option<i64>,
    /// Rows within the trailing window before the maximum
    pub recent_rows: Option<u64>,
}

impl DateExtractionResult {
    pub fn absent(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            max_value: None,
            raw_max: None,
            min_value: None,
            row_count: None,
            non_null_count: None,
            distinct_count: None,
            null_percentage: None,
            span_days: None,
            recent_rows: None,
        }
    }

    /// Percentage of `total` rows lacking a value; 0 for an empty table
    pub fn null_percentage_of(non_null: u64, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let nulls = total.saturating_sub(non_null) as f64;
        (nulls / total as f64 * 10_000.0).round() / 100.0
    }

    /// `TABLE.COLUMN` label used in findings
    pub fn label(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

/// Per-archive map of `(table, column)` to its latest value
///
/// Kept as a sorted vector so it serializes as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatestDates {
    columns: Vec<DateExtractionResult>,
}

impl LatestDates {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, table: &str, column: &str) -> Result<usize, usize> {
        self.columns
            .binary_search_by(|c| (c.table.as_str(), c.column.as_str()).cmp(&(table, column)))
    }

    /// Insert a result, keeping the newer maximum if the key already exists
    pub fn insert(&mut self, result: DateExtractionResult) {
        match self.position(&result.table, &result.column) {
            Ok(index) => {
                let existing = &mut self.columns[index];
                if result.max_value > existing.max_value {
                    *existing = result;
                }
            }
            Err(index) => self.columns.insert(index, result),
        }
    }

    pub fn merge(&mut self, other: LatestDates) {
        for result in other.columns {
            self.insert(result);
        }
    }

    pub fn get(&self, table: &str, column: &str) -> Option<&DateExtractionResult> {
        self.position(table, column).ok().map(|i| &self.columns[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateExtractionResult> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Freshest non-null value across all columns
    pub fn freshest(&self) -> Option<NaiveDateTime> {
        self.columns.iter().filter_map(|c| c.max_value).max()
    }
}
