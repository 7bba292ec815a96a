// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Channel name shared by the Android and iOS handlers.
pub const DEFAULT_CHANNEL_NAME: &str = "com.example.lovegame/channel";

/// Bridge settings. Every field has a default, so a partial JSON file is
/// enough to override a single value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name of the method channel (`"<app-namespace>/channel"`).
    pub channel_name: String,
    /// Upper bound on concurrently executing operations.
    pub max_workers: usize,
    /// Artificial latency added to the stub operations, in milliseconds.
    pub simulated_latency_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_owned(),
            max_workers: 4,
            simulated_latency_ms: 0,
        }
    }
}

impl BridgeConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`BridgeConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(path.as_ref()) {
            Err(BridgeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_name.trim().is_empty() {
            return Err(BridgeError::Config("channel_name must not be empty".into()));
        }
        if self.max_workers == 0 {
            return Err(BridgeError::Config("max_workers must be at least 1".into()));
        }
        Ok(())
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BridgeConfig::default();
        assert_eq!(config.channel_name, "com.example.lovegame/channel");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, r#"{ "max_workers": 2 }"#).unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.channel_name, DEFAULT_CHANNEL_NAME);
        assert_eq!(config.simulated_latency(), Duration::ZERO);
    }

    #[test]
    fn zero_workers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, r#"{ "max_workers": 0 }"#).unwrap();

        assert!(matches!(BridgeConfig::load(&path), Err(BridgeError::Config(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }
}
