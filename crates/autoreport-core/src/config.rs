/// Analysis configuration
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{AnalysisError, Result};

/// Smallest chunk the digest engine will read at a time
pub const MIN_CHUNK_SIZE: usize = 4 * 1024;
/// Largest chunk the digest engine will read at a time
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
/// Default digest chunk size
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Language preset for report headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLanguage {
    #[default]
    English,
    Portuguese,
}

/// Read-only settings for one or many analysis requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Bytes read per digest iteration (clamped to `MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE`)
    pub chunk_size: usize,

    /// Upper bound on the wall-clock time spent digesting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Header language used by the report synthesizer
    pub language: ReportLanguage,

    /// Leave vendor MakerNote blobs out of the tag directory
    pub skip_maker_note: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout_secs: None,
            language: ReportLanguage::English,
            skip_maker_note: true,
        }
    }
}

impl AnalysisConfig {
    /// Load from a JSON file. Missing keys fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&json).map_err(|e| AnalysisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(AnalysisError::Config("chunk_size must be positive".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(AnalysisError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
