use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Directory holding all durable state.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Snapshot document name inside `data_dir`.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    /// Periodic autosave interval.
    #[serde(default = "default_autosave_secs")]
    pub autosave_secs: u64,
}

impl StorageConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.snapshot_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_file: default_snapshot_file(),
            autosave_secs: default_autosave_secs(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_snapshot_file() -> String {
    "reputation.json".to_string()
}

fn default_autosave_secs() -> u64 {
    300
}
