//! Analysis configuration
//!
//! Every section has defaults, so a config file only needs the values it
//! overrides. Files are JSON:
//!
//! ```json
//! {
//!   "thresholds": { "healthy_hours": 12 },
//!   "workers": { "max_workers": 4 },
//!   "reader": { "strict_crc": true }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::archive::{DetectionConfig, ReaderOptions};
use crate::database::SchemaCatalog;
use crate::error::{AnalysisError, AnalysisResult};
use crate::sync::Thresholds;
use crate::tape::HeaderConfig;

/// Current config file version
pub const CONFIG_VERSION: u32 = 1;

/// Config file name under the user config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Upper bound on the default worker count
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Worker pool and scratch space settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub max_workers: usize,
    /// Root for temporary materializations; system temp dir when unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get().clamp(1, DEFAULT_MAX_WORKERS),
            temp_dir: None,
        }
    }
}

impl WorkerConfig {
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub thresholds: Thresholds,
    pub detection: DetectionConfig,
    pub header: HeaderConfig,
    pub schemas: SchemaCatalog,
    pub workers: WorkerConfig,
    pub reader: ReaderOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            thresholds: Thresholds::default(),
            detection: DetectionConfig::default(),
            header: HeaderConfig::default(),
            schemas: SchemaCatalog::default(),
            workers: WorkerConfig::default(),
            reader: ReaderOptions::default(),
        }
    }
}

impl Config {
    /// Default config location: `<config dir>/bakcheck/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bakcheck").join(CONFIG_FILE_NAME))
    }

    /// Load a config file
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        info!(path = %path.display(), "Loading config");
        let json = fs::read_to_string(path)
            .map_err(|e| AnalysisError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&json)?;
        if config.version > CONFIG_VERSION {
            warn!(
                version = config.version,
                supported = CONFIG_VERSION,
                "Config file version is newer than supported"
            );
        }
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> AnalysisResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(default) if default.exists() => Self::load(&default),
            _ => Ok(Self::default()),
        }
    }

    /// Save as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> AnalysisResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, &json)?;
        info!(path = %path.display(), bytes = json.len(), "Config saved");
        Ok(())
    }

    fn validate(&self) -> AnalysisResult<()> {
        if self.thresholds.healthy_hours > self.thresholds.warning_hours {
            return Err(AnalysisError::Config(format!(
                "healthy_hours ({}) exceeds warning_hours ({})",
                self.thresholds.healthy_hours, self.thresholds.warning_hours
            )));
        }
        if self.workers.max_workers == 0 {
            return Err(AnalysisError::Config("max_workers must be at least 1".to_string()));
        }
        Ok(())
    }
}
