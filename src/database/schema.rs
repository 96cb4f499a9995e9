//! Schema-kind catalog
//!
//! Which marker tables identify each kind of database, and which date columns
//! are tracked per table. This is configuration data: adding tables, columns
//! or markers is a config change, not a code change.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::SchemaKind;
use crate::error::AnalysisResult;

/// A table and the date columns tracked on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTable {
    pub table: String,
    pub date_columns: Vec<String>,
}

impl TrackedTable {
    pub fn new(table: &str, date_columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            date_columns: date_columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Marker tables and tracked tables of one schema kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub kind: SchemaKind,
    /// Any of these tables present identifies the kind (case-insensitive)
    pub markers: Vec<String>,
    pub tables: Vec<TrackedTable>,
}

/// Ordered list of known schema kinds; the first matching definition wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub kinds: Vec<SchemaDefinition>,
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self {
            kinds: vec![
                SchemaDefinition {
                    kind: SchemaKind::Plantware,
                    markers: vec!["PR_TASKREG".into(), "PR_TASK".into(), "PR_PROJECT".into()],
                    tables: vec![
                        TrackedTable::new("PR_TASKREG", &["DocDate", "CreatedDate", "UpdatedDate"]),
                        TrackedTable::new("IN_FUELISSUE", &["CreateDate", "UpdateDate", "PostDate"]),
                    ],
                },
                SchemaDefinition {
                    kind: SchemaKind::Venus,
                    markers: vec!["TA_MACHINE".into(), "HR_T_TAMACHINE".into()],
                    tables: vec![
                        TrackedTable::new("HR_T_TAMachine", &["TADate"]),
                        TrackedTable::new("TA_MACHINE", &["MACHINE_DATE", "LAST_UPDATE"]),
                    ],
                },
                SchemaDefinition {
                    kind: SchemaKind::Staging,
                    markers: vec!["GWSCANNER".into(), "GWSCANNERDATA".into()],
                    tables: vec![
                        TrackedTable::new("GWSCANNER", &["UPDATE_DATE", "SCAN_DATE", "CREATED_DATE"]),
                        TrackedTable::new(
                            "Gwscannerdata",
                            &["TRANSDATE", "DATECREATED", "INTEGRATETIME", "SCANOUTDATETIME"],
                        ),
                        TrackedTable::new("Ffbscannerdata", &["TRANSDATE", "DATECREATED", "INTEGRATETIME"]),
                    ],
                },
            ],
        }
    }
}

impl SchemaCatalog {
    pub fn definition(&self, kind: SchemaKind) -> Option<&SchemaDefinition> {
        self.kinds.iter().find(|d| d.kind == kind)
    }

    /// Match a set of table names (uppercased) against the catalog
    pub fn match_tables(&self, tables: &TableIndex) -> SchemaKind {
        self.kinds
            .iter()
            .find(|def| def.markers.iter().any(|m| tables.contains(m)))
            .map(|def| def.kind)
            .unwrap_or(SchemaKind::GenericUnknown)
    }
}

/// Case-insensitive index of the tables present in a database
#[derive(Debug, Clone, Default)]
pub struct TableIndex {
    by_upper: HashMap<String, String>,
}

impl TableIndex {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let by_upper = names
            .into_iter()
            .map(|n| {
                let name = n.into();
                (name.to_uppercase(), name)
            })
            .collect();
        Self { by_upper }
    }

    /// Read user tables from `sqlite_master`
    pub fn load(conn: &Connection) -> AnalysisResult<Self> {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_names(names))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_upper.contains_key(&name.to_uppercase())
    }

    /// Actual stored name of a table
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.by_upper.get(&name.to_uppercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_upper.len()
    }
}

/// Detect the schema kind of an open database
pub fn detect_schema_kind(conn: &Connection, catalog: &SchemaCatalog) -> AnalysisResult<(SchemaKind, TableIndex)> {
    let tables = TableIndex::load(conn)?;
    let kind = catalog.match_tables(&tables);
    debug!(kind = %kind, table_count = tables.len(), "Schema kind detected");
    Ok((kind, tables))
}
