// SPDX-License-Identifier: GPL-3.0-only

//! User configuration handling

use crate::constants::{
    DEFAULT_DECODE_MAX_DIMENSION, DEFAULT_FRAME_INTERVAL, DEFAULT_FRAME_POOL_SIZE,
};
use crate::errors::{ScanError, ScanResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Pipeline tunables persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum dimension for QR detection; larger frames are downscaled
    pub decode_max_dimension: u32,
    /// Number of frames that may be alive at once
    pub frame_pool_size: usize,
    /// Native frame interval for file-backed devices, in milliseconds
    pub frame_interval_ms: u64,
    /// Last input path used by the scan command
    pub last_input: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decode_max_dimension: DEFAULT_DECODE_MAX_DIMENSION,
            frame_pool_size: DEFAULT_FRAME_POOL_SIZE,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL.as_millis() as u64,
            last_input: None,
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults on any problem
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                    Self::default()
                }
            },
            // Missing file is the first-run case
            Err(_) => Self::default(),
        }
    }

    /// Persist the configuration
    pub fn save(&self) -> ScanResult<()> {
        let path = Self::path()
            .ok_or_else(|| ScanError::Config("no config directory available".into()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ScanError::Config(e.to_string()))?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    /// Frame interval as a duration
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("podscan").join("config.json"))
    }
}
