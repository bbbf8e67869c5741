//! TOML-based timer configuration.
//!
//! Stores the user's timer preferences:
//! - Phase durations and the long-break cadence
//! - Sound / notification toggles (carried for the host, unused by the core)
//! - Auto-advance and inactivity pausing
//! - Presentation-only custom colors
//!
//! Configuration is stored at `<data dir>/config.toml`. Out-of-range values
//! are clamped when the file is read, never reported as errors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::Phase;

/// Largest minute count accepted for durations and the inactivity threshold.
///
/// Anything above cannot be represented as a `chrono::Duration`.
pub const MAX_MINUTES: i64 = i64::MAX / 60_000;

/// Timer configuration, read-only to the core.
///
/// Durations are signed so that hand-edited files with zero or negative
/// values still parse; [`TimerConfiguration::sanitized`] clamps them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfiguration {
    #[serde(default = "default_work_duration")]
    pub work_duration_minutes: i64,
    #[serde(default = "default_break_duration")]
    pub break_duration_minutes: i64,
    #[serde(default = "default_long_break_duration")]
    pub long_break_duration_minutes: i64,
    #[serde(default = "default_cycles_before_long_break")]
    pub cycles_before_long_break: i64,
    #[serde(default = "default_true")]
    pub play_sound: bool,
    #[serde(default = "default_true")]
    pub show_notifications: bool,
    #[serde(default)]
    pub auto_start_next_phase: bool,
    #[serde(default)]
    pub pause_on_inactivity: bool,
    #[serde(default = "default_inactivity_threshold")]
    pub inactivity_threshold_minutes: i64,
    /// Presentation-only; the core never reads it.
    #[serde(default)]
    pub custom_colors: BTreeMap<String, String>,
}

fn default_work_duration() -> i64 {
    25
}
fn default_break_duration() -> i64 {
    5
}
fn default_long_break_duration() -> i64 {
    15
}
fn default_cycles_before_long_break() -> i64 {
    4
}
fn default_inactivity_threshold() -> i64 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfiguration {
    fn default() -> Self {
        Self {
            work_duration_minutes: default_work_duration(),
            break_duration_minutes: default_break_duration(),
            long_break_duration_minutes: default_long_break_duration(),
            cycles_before_long_break: default_cycles_before_long_break(),
            play_sound: true,
            show_notifications: true,
            auto_start_next_phase: false,
            pause_on_inactivity: false,
            inactivity_threshold_minutes: default_inactivity_threshold(),
            custom_colors: BTreeMap::new(),
        }
    }
}

impl TimerConfiguration {
    /// Clamp every numeric option into `1..=MAX_MINUTES` (cycles into the
    /// `u32` range).
    pub fn sanitized(mut self) -> Self {
        for (name, value, max) in [
            ("work_duration_minutes", &mut self.work_duration_minutes, MAX_MINUTES),
            ("break_duration_minutes", &mut self.break_duration_minutes, MAX_MINUTES),
            ("long_break_duration_minutes", &mut self.long_break_duration_minutes, MAX_MINUTES),
            ("cycles_before_long_break", &mut self.cycles_before_long_break, i64::from(u32::MAX)),
            ("inactivity_threshold_minutes", &mut self.inactivity_threshold_minutes, MAX_MINUTES),
        ] {
            let clamped = (*value).clamp(1, max);
            if clamped != *value {
                tracing::debug!(option = name, value = *value, clamped, "clamping configuration value");
                *value = clamped;
            }
        }
        self
    }

    /// Configured length of `phase` in minutes (never below 1).
    pub fn duration_minutes(&self, phase: Phase) -> u64 {
        let minutes = match phase {
            Phase::Work => self.work_duration_minutes,
            Phase::Break => self.break_duration_minutes,
            Phase::LongBreak => self.long_break_duration_minutes,
        };
        minutes.max(1) as u64
    }

    pub fn cycles_before_long_break(&self) -> u32 {
        self.cycles_before_long_break.clamp(1, i64::from(u32::MAX)) as u32
    }

    pub fn inactivity_threshold(&self) -> chrono::Duration {
        chrono::Duration::try_minutes(self.inactivity_threshold_minutes.clamp(1, MAX_MINUTES))
            .unwrap_or(chrono::Duration::MAX)
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        // custom_colors is an open map: new names are accepted as strings.
        let open_map = key.starts_with("custom_colors.");

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match obj.get(part) {
                    Some(serde_json::Value::Bool(_)) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(format!("expected a boolean: {e}")))?,
                    ),
                    Some(serde_json::Value::Number(_)) => serde_json::Value::Number(
                        value
                            .parse::<i64>()
                            .map_err(|e| invalid(format!("expected an integer: {e}")))?
                            .into(),
                    ),
                    Some(serde_json::Value::Object(_)) | Some(serde_json::Value::Array(_)) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    Some(_) => serde_json::Value::String(value.into()),
                    None if open_map => serde_json::Value::String(value.into()),
                    None => return Err(ConfigError::UnknownKey(key.to_string())),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default location, `<data dir>/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from the default location, writing defaults if the file is missing.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// default configuration cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: TimerConfiguration = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                Ok(cfg.sanitized())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
        }
    }

    /// Load from the default location, returning defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default configuration");
            Self::default()
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by key (`custom_colors.<name>` for colors).
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by key in memory. The result is sanitized; call
    /// [`save`](Self::save) to persist it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: TimerConfiguration =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        *self = updated.sanitized();
        Ok(())
    }
}
