// Common utilities shared across the analysis stages

pub mod binary;
pub mod hash;
pub mod magic;

// Re-exports for convenience
pub use hash::{hash_file, DigestAlgorithm};
pub use magic::{classify, deep_inspect, ConfidenceBasis, FormatClassification, FormatKind};

// Shared constants
pub const BUFFER_SIZE: usize = 8 * 1024 * 1024; // 8MB buffer for streaming reads
