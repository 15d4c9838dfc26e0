//! Executor configuration.
//!
//! Loaded from TOML or built in code; every field has a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RdaoError, Result};

/// How the driver hands rows to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Column metadata, then one row at a time.
    #[default]
    Streamed,
    /// Each result set collected first, then handed over as one batch.
    Bulk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Emit per-operation diagnostics (resolved SQL, elapsed time, errors).
    #[serde(default = "default_debug")]
    pub debug: bool,

    /// Idle timeout in milliseconds. Stored for callers and drivers; the
    /// executor itself does not enforce it.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub delivery: DeliveryMode,
}

fn default_debug() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            debug: default_debug(),
            timeout_ms: default_timeout_ms(),
            delivery: DeliveryMode::default(),
        }
    }
}

impl ExecutorConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RdaoError::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }
}
