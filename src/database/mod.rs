//! Embedded database inspection
//!
//! Detects which application schema a SQLite file belongs to and extracts the
//! latest value of each tracked date column.

pub mod extract;
pub mod schema;
pub mod types;

pub use extract::{extract_latest_dates, inspect_database, DatabaseExtraction};
pub use schema::{detect_schema_kind, SchemaCatalog, SchemaDefinition, TrackedTable};
pub use types::{DateExtractionResult, LatestDates, SchemaKind};
