//! Proprietary tape-format backup headers
//!
//! Backups of SQL Server and Plantware P3 databases are stored in a tape
//! format whose payload layout is not documented. Only the fixed header is
//! decoded; the record count is an estimate.

pub mod parser;
pub mod types;

pub use parser::analyze_header;
pub use types::{HeaderConfig, ProprietaryHeaderInfo, TapeVariant, TAPE_HEADER_LEN};
