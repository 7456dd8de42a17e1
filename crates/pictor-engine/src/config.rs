//! Engine configuration.
//!
//! Every section has a `Default` so a missing or partial config file still yields
//! a usable engine. Files are JSON; unknown keys are ignored.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;
use crate::paint::Color;

/// Which render surface the host creates at startup.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// wgpu on a native window.
    Native,
    /// wgpu WebGL2 on a browser canvas.
    Web,
    /// No GPU; draw streams are recorded only.
    Headless,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(target_arch = "wasm32") {
            BackendKind::Web
        } else {
            BackendKind::Native
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `env_logger` filter string; `RUST_LOG` is used when absent.
    pub filter: Option<String>,
}

impl LoggingSettings {
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            env_filter: self.filter.clone(),
            ..LoggingConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub backend: BackendKind,

    /// Compilation budget per frame in milliseconds. `None` disables the budget.
    pub frame_budget_ms: Option<u64>,

    /// Maximum distance between a curve and its flattened polyline, in device pixels.
    pub flatten_tolerance: f64,

    pub clear_color: Color,

    /// Rows in the GPU gradient ramp atlas (one row per distinct stop list).
    pub ramp_atlas_rows: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            frame_budget_ms: Some(12),
            flatten_tolerance: 0.25,
            clear_color: Color::WHITE,
            ramp_atlas_rows: 256,
        }
    }
}

impl RenderConfig {
    pub fn frame_budget(&self) -> Option<Duration> {
        self.frame_budget_ms.map(Duration::from_millis)
    }

    /// Copy of the defaults with the budget disabled.
    pub fn unbudgeted() -> Self {
        Self {
            frame_budget_ms: None,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Network timeout for a single fetch.
    pub timeout_secs: u64,

    /// Payloads larger than this are rejected before parsing.
    pub max_payload_bytes: u64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_payload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl ImportSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingSettings,
    pub render: RenderConfig,
    pub import: ImportSettings,
}

impl EngineConfig {
    /// Loads a config file, falling back to defaults when it is missing or malformed.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("using default configuration: {e:#}");
                Self::default()
            }
        }
    }

    /// Loads a config file. A missing file is not an error.
    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse engine config")
    }
}
