/// Plugin configuration, loadable from RON with every field optional.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Largest accepted history capacity.
pub const MAX_HISTORY_CAPACITY: usize = 1_000;
/// Largest accepted number of transient reveal frames.
pub const MAX_REVEAL_STEPS: u32 = 1_000;
/// Largest accepted per-frame delay or delay growth.
pub const MAX_FRAME_DELAY_MS: u64 = 60_000;
/// Largest accepted interval, dwell or notification duration (one day).
pub const MAX_INTERVAL_MS: u64 = 86_400_000;

/// Timing and length of the decelerating reveal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Number of transient frames shown before the final name.
    pub max_steps: u32,
    /// Delay before the first frame, in milliseconds.
    pub initial_delay_ms: u64,
    /// Added to the delay after every frame, in milliseconds.
    pub delay_growth_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            max_steps: 15,
            initial_delay_ms: 80,
            delay_growth_ms: 20,
        }
    }
}

impl RevealConfig {
    /// The shorter reveal used by the standalone result dialog.
    pub fn legacy_dialog() -> Self {
        Self {
            max_steps: 12,
            ..Self::default()
        }
    }

    /// Delay scheduled after `steps` frames have been shown.
    pub fn delay_after(&self, steps: u32) -> u64 {
        self.delay_growth_ms
            .saturating_mul(u64::from(steps))
            .saturating_add(self.initial_delay_ms)
    }

    /// Total time from trigger to the final frame.
    pub fn total_duration_ms(&self) -> u64 {
        (0..=self.max_steps).fold(0, |total: u64, s| total.saturating_add(self.delay_after(s)))
    }
}

/// Strings written to the display slot and the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub clock_title: String,
    pub in_progress_title: String,
    pub result_title: String,
    pub error_title: String,
    pub empty_roster: String,
    pub notification_title: String,
    pub notification_subtitle: String,
    /// Notification body; `{name}` is replaced by the picked name.
    pub notification_body: String,
    pub history_empty: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            clock_title: "Current time".to_string(),
            in_progress_title: "Picking...".to_string(),
            result_title: "Roll call result".to_string(),
            error_title: "Error".to_string(),
            empty_roster: "Roster is empty".to_string(),
            notification_title: "Roll call".to_string(),
            notification_subtitle: "Name picked".to_string(),
            notification_body: "{name} has been picked!".to_string(),
            history_empty: "No picks yet".to_string(),
        }
    }
}

impl Labels {
    pub fn notification_body_for(&self, name: &str) -> String {
        self.notification_body.replace("{name}", name)
    }

    /// Titles that mark the slot as owned by the reveal.
    pub fn is_reveal_title(&self, title: &str) -> bool {
        title == self.in_progress_title || title == self.result_title
    }
}

/// Top-level plugin configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub widget_code: String,
    pub widget_name: String,
    pub widget_width: u32,
    pub clock_interval_ms: u64,
    pub reveal: RevealConfig,
    /// How long the final name stays up before the clock returns.
    pub result_dwell_ms: u64,
    /// How long the empty-roster message stays up.
    pub empty_roster_dwell_ms: u64,
    pub notification_duration_ms: u64,
    pub history_capacity: usize,
    /// Fixed RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub labels: Labels,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            widget_code: "random_name_result".to_string(),
            widget_name: "Roll call result".to_string(),
            widget_width: 250,
            clock_interval_ms: 1000,
            reveal: RevealConfig::default(),
            result_dwell_ms: 10_000,
            empty_roster_dwell_ms: 3_000,
            notification_duration_ms: 5_000,
            history_capacity: 10,
            seed: None,
            labels: Labels::default(),
        }
    }
}

impl PluginConfig {
    pub fn load_from_ron(path: &Path) -> Result<PluginConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<PluginConfig, ConfigError> {
        let config: PluginConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "clock_interval_ms must be positive".to_string(),
            ));
        }
        if self.history_capacity == 0 || self.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "history_capacity must be between 1 and {}",
                MAX_HISTORY_CAPACITY
            )));
        }
        if self.empty_roster_dwell_ms > 3_000 {
            return Err(ConfigError::Invalid(
                "empty_roster_dwell_ms must not exceed 3000".to_string(),
            ));
        }
        if self.reveal.max_steps > MAX_REVEAL_STEPS {
            return Err(ConfigError::Invalid(format!(
                "reveal.max_steps must not exceed {}",
                MAX_REVEAL_STEPS
            )));
        }
        for (field, value) in [
            ("reveal.initial_delay_ms", self.reveal.initial_delay_ms),
            ("reveal.delay_growth_ms", self.reveal.delay_growth_ms),
        ] {
            if value > MAX_FRAME_DELAY_MS {
                return Err(ConfigError::Invalid(format!(
                    "{} must not exceed {}",
                    field, MAX_FRAME_DELAY_MS
                )));
            }
        }
        for (field, value) in [
            ("clock_interval_ms", self.clock_interval_ms),
            ("result_dwell_ms", self.result_dwell_ms),
            ("notification_duration_ms", self.notification_duration_ms),
        ] {
            if value > MAX_INTERVAL_MS {
                return Err(ConfigError::Invalid(format!(
                    "{} must not exceed {}",
                    field, MAX_INTERVAL_MS
                )));
            }
        }
        Ok(())
    }
}
