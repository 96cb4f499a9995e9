// Archive digest utilities
//
// Optional whole-archive digest (MD5 / SHA-256 / CRC32) attached to an
// archive summary. Off by default: cost is O(archive size).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crc32fast::Hasher as Crc32Hasher;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use super::BUFFER_SIZE;
use crate::error::{AnalysisError, AnalysisResult};

/// Digest algorithms available for archive fingerprints
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Md5,
    Sha256,
    Crc32,
}

impl DigestAlgorithm {
    /// Get the canonical algorithm name
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Crc32 => "CRC32",
        }
    }
}

/// Incremental hasher over the supported algorithms
pub enum StreamingHasher {
    Md5(Md5),
    Sha256(Sha256),
    Crc32(Crc32Hasher),
}

impl StreamingHasher {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => StreamingHasher::Md5(Md5::new()),
            DigestAlgorithm::Sha256 => StreamingHasher::Sha256(Sha256::new()),
            DigestAlgorithm::Crc32 => StreamingHasher::Crc32(Crc32Hasher::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            StreamingHasher::Md5(h) => Digest::update(h, data),
            StreamingHasher::Sha256(h) => Digest::update(h, data),
            StreamingHasher::Crc32(h) => h.update(data),
        }
    }

    /// Finalize and return the hash as a hex string
    pub fn finalize(self) -> String {
        match self {
            StreamingHasher::Md5(h) => hex::encode(h.finalize()),
            StreamingHasher::Sha256(h) => hex::encode(h.finalize()),
            StreamingHasher::Crc32(h) => format!("{:08x}", h.finalize()),
        }
    }
}

/// Hash a file in streaming fashion
#[instrument(skip(path), fields(path = %path.display()))]
pub fn hash_file(path: &Path, algorithm: DigestAlgorithm) -> AnalysisResult<String> {
    if !path.exists() {
        return Err(AnalysisError::NotFound(path.display().to_string()));
    }

    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = StreamingHasher::new(algorithm);
    let mut total = 0u64;

    loop {
        let buf = reader.fill_buf()?;
        let len = buf.len();
        if len == 0 {
            break;
        }
        hasher.update(buf);
        reader.consume(len);
        total += len as u64;
    }

    let hash = hasher.finalize();
    debug!(algorithm = algorithm.name(), bytes = total, hash = %hash, "File digest complete");
    Ok(hash)
}
