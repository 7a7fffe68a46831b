//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vigil_classifier::ClassifierConfig;

/// Configuration for the assembled triage engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Chat-risk classifier settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Store journal settings
    #[serde(default)]
    pub journal: JournalConfig,
}

/// Journal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Journal file path; `None` disables durability
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Flush to disk after this many events
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: None,
            flush_interval: default_flush_interval(),
        }
    }
}

fn default_flush_interval() -> usize {
    10
}
