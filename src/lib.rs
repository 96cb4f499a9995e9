//! bakcheck - backup artifact analysis
//!
//! Opens backup ZIP archives, verifies their integrity, classifies the
//! database payloads inside, decodes proprietary tape headers, extracts the
//! latest date of tracked SQLite columns and scores how current the backup is.

pub mod archive;
pub mod batch;
pub mod common;
pub mod config;
pub mod database;
pub mod error;
pub mod extraction;
pub mod findings;
pub mod logging;
pub mod pipeline;
pub mod sync;
pub mod tape;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::BatchAnalyzer;
pub use config::Config;
pub use error::{AnalysisError, AnalysisResult};
pub use pipeline::{analyze_archive, AnalysisOutcome, ArchiveAnalysis, CancelToken, FailedAnalysis};
