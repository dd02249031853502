//! Analyzer configuration
//!
//! Every temporal threshold used by the parser and the friction analyzer lives
//! here so that embedders can tune them without forking the pattern detectors.

use crate::error::LensError;
use serde::{Deserialize, Serialize};

/// Clicks on one node within this window count toward a rage click
pub const DEFAULT_RAGE_CLICK_WINDOW_MS: i64 = 1_000;

/// Number of clicks inside the window that makes a rage click
pub const DEFAULT_RAGE_CLICK_THRESHOLD: usize = 3;

/// Rage clicks on the same node closer than this collapse during finalize
pub const DEFAULT_RAGE_CLICK_DEDUP_MS: i64 = 100;

/// Silence after the last interaction that ends the session (5 minutes)
pub const DEFAULT_IDLE_THRESHOLD_MS: i64 = 300_000;

/// Gap between two interactions reported as hesitation
pub const DEFAULT_HESITATION_THRESHOLD_MS: i64 = 5_000;

/// Window in which a click must produce a follow-on interaction
pub const DEFAULT_DEAD_CLICK_WINDOW_MS: i64 = 2_000;

/// Labels longer than this are truncated
pub const DEFAULT_MAX_LABEL_CHARS: usize = 100;

/// Tunable thresholds for interaction classification and friction analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Sliding window for rage-click detection (ms)
    pub rage_click_window_ms: i64,
    /// Minimum clicks inside the window
    pub rage_click_threshold: usize,
    /// Near-duplicate rage clicks closer than this collapse (ms)
    pub rage_click_dedup_ms: i64,
    /// Inactivity that synthesizes a leave-page interaction (ms)
    pub idle_threshold_ms: i64,
    /// Gap between interactions that counts as hesitation (ms)
    pub hesitation_threshold_ms: i64,
    /// Window in which a click must be followed by a reaction (ms)
    pub dead_click_window_ms: i64,
    /// Maximum label length in characters
    pub max_label_chars: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rage_click_window_ms: DEFAULT_RAGE_CLICK_WINDOW_MS,
            rage_click_threshold: DEFAULT_RAGE_CLICK_THRESHOLD,
            rage_click_dedup_ms: DEFAULT_RAGE_CLICK_DEDUP_MS,
            idle_threshold_ms: DEFAULT_IDLE_THRESHOLD_MS,
            hesitation_threshold_ms: DEFAULT_HESITATION_THRESHOLD_MS,
            dead_click_window_ms: DEFAULT_DEAD_CLICK_WINDOW_MS,
            max_label_chars: DEFAULT_MAX_LABEL_CHARS,
        }
    }
}

impl AnalyzerConfig {
    /// Parse a configuration from JSON; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, LensError> {
        let config: AnalyzerConfig = serde_json::from_str(json)
            .map_err(|e| LensError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, LensError> {
        serde_json::to_string_pretty(self).map_err(|e| LensError::EncodingError(e.to_string()))
    }

    /// Check that every threshold is usable
    pub fn validate(&self) -> Result<(), LensError> {
        if self.rage_click_threshold < 2 {
            return Err(LensError::ConfigError(
                "rage_click_threshold must be at least 2".to_string(),
            ));
        }

        let windows = [
            ("rage_click_window_ms", self.rage_click_window_ms),
            ("rage_click_dedup_ms", self.rage_click_dedup_ms),
            ("idle_threshold_ms", self.idle_threshold_ms),
            ("hesitation_threshold_ms", self.hesitation_threshold_ms),
            ("dead_click_window_ms", self.dead_click_window_ms),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, value)| *value < 0) {
            return Err(LensError::ConfigError(format!("{} must not be negative", name)));
        }

        if self.max_label_chars == 0 {
            return Err(LensError::ConfigError(
                "max_label_chars must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
