//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Host plumbing (`[input]`, `[journal]`) is validated strictly and rejected
//! when out of range. Classifier tuning (`[classifier]`) is user-facing and
//! is corrected to safe defaults instead, see [`ClassifierOptions::sanitized`].

use clap::ValueEnum;
use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::controller::hysteresis::{DEFAULT_PRESS_THRESHOLD, DEFAULT_RELEASE_THRESHOLD};
use crate::controller::profile::{DeviceProfile, ProfilePreset};
use crate::error::{CrossbarError, Result};

/// Longest accepted double-tap window, in seconds.
pub const MAX_DOUBLE_TAP_WINDOW_S: f64 = 5.0;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub classifier: ClassifierOptions,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

/// How input reaches the classifier.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// One call per discrete button/axis event.
    #[default]
    Event,
    /// One full-state sample per tick.
    Polled,
}

/// Input device configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default)]
    pub device_path: String,

    #[serde(default)]
    pub delivery: Delivery,

    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: u32,

    /// Grab the gamepad and re-emit unsuppressed input on a virtual device.
    #[serde(default = "default_true")]
    pub grab: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            delivery: Delivery::default(),
            poll_rate_hz: default_poll_rate_hz(),
            grab: default_true(),
        }
    }
}

/// Classifier options
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClassifierOptions {
    #[serde(default = "default_true")]
    pub expanded_combo_enabled: bool,

    #[serde(default = "default_true")]
    pub double_tap_enabled: bool,

    #[serde(default = "default_double_tap_window_s")]
    pub double_tap_window_s: f64,

    #[serde(default = "default_press_threshold")]
    pub press_threshold: u8,

    #[serde(default = "default_release_threshold")]
    pub release_threshold: u8,

    #[serde(default = "default_min_pressed_display_ms")]
    pub min_pressed_display_ms: u64,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            expanded_combo_enabled: default_true(),
            double_tap_enabled: default_true(),
            double_tap_window_s: default_double_tap_window_s(),
            press_threshold: default_press_threshold(),
            release_threshold: default_release_threshold(),
            min_pressed_display_ms: default_min_pressed_display_ms(),
        }
    }
}

/// Device profile selection
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProfileConfig {
    #[serde(default)]
    pub preset: ProfilePreset,

    /// Replaces the preset when present.
    #[serde(default)]
    pub custom: Option<DeviceProfile>,
}

/// Activation journal configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JournalConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_journal_path")]
    pub path: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_journal_path(),
        }
    }
}

// Default value functions
fn default_poll_rate_hz() -> u32 { 60 }

fn default_true() -> bool { true }
fn default_double_tap_window_s() -> f64 { 0.3 }
fn default_press_threshold() -> u8 { DEFAULT_PRESS_THRESHOLD }
fn default_release_threshold() -> u8 { DEFAULT_RELEASE_THRESHOLD }
fn default_min_pressed_display_ms() -> u64 { 100 }

fn default_journal_path() -> String { "./activations.jsonl".to_string() }

impl ClassifierOptions {
    /// Returns a copy with unusable values replaced by defaults.
    ///
    /// - A zero threshold, or `release_threshold >= press_threshold`, resets
    ///   both thresholds.
    /// - A negative, non-finite, or longer than [`MAX_DOUBLE_TAP_WINDOW_S`]
    ///   double-tap window resets the window. A window of exactly zero is
    ///   kept and disables double-tap.
    ///
    /// # Examples
    ///
    /// ```
    /// use crossbar_input::config::ClassifierOptions;
    ///
    /// let options = ClassifierOptions {
    ///     press_threshold: 10,
    ///     release_threshold: 40,
    ///     ..ClassifierOptions::default()
    /// };
    /// let fixed = options.sanitized();
    /// assert!(fixed.release_threshold < fixed.press_threshold);
    /// ```
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut options = self.clone();

        if options.press_threshold == 0
            || options.release_threshold == 0
            || options.release_threshold >= options.press_threshold
        {
            warn!(
                "Invalid trigger thresholds (press {}, release {}), using defaults ({}, {})",
                options.press_threshold,
                options.release_threshold,
                DEFAULT_PRESS_THRESHOLD,
                DEFAULT_RELEASE_THRESHOLD
            );
            options.press_threshold = DEFAULT_PRESS_THRESHOLD;
            options.release_threshold = DEFAULT_RELEASE_THRESHOLD;
        }

        if !(0.0..=MAX_DOUBLE_TAP_WINDOW_S).contains(&options.double_tap_window_s) {
            warn!(
                "Invalid double_tap_window_s {}, using default {}",
                options.double_tap_window_s,
                default_double_tap_window_s()
            );
            options.double_tap_window_s = default_double_tap_window_s();
        }

        options
    }

    /// Double-tap window as a duration. Expects sanitized options.
    #[must_use]
    pub fn double_tap_window(&self) -> Duration {
        Duration::try_from_secs_f64(self.double_tap_window_s).unwrap_or_default()
    }

    /// Minimum pressed-slot display time.
    #[must_use]
    pub fn min_pressed_display(&self) -> Duration {
        Duration::from_millis(self.min_pressed_display_ms)
    }
}

impl ProfileConfig {
    /// Returns the configured profile.
    #[must_use]
    pub fn build(&self) -> DeviceProfile {
        match &self.custom {
            Some(profile) => profile.clone(),
            None => DeviceProfile::from_preset(self.preset),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails (including malformed custom profiles)
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use crossbar_input::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate host configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any host configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.input.poll_rate_hz == 0 || self.input.poll_rate_hz > 1000 {
            return Err(CrossbarError::Config(
                toml::de::Error::custom("poll_rate_hz must be between 1 and 1000")
            ));
        }

        if self.journal.enabled && self.journal.path.is_empty() {
            return Err(CrossbarError::Config(
                toml::de::Error::custom("journal path cannot be empty when enabled")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.input.delivery, Delivery::Event);
        assert_eq!(config.profile.preset, ProfilePreset::Dualsense);
        assert!(!config.journal.enabled);
        assert!(config.input.grab);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[input]
delivery = "polled"
poll_rate_hz = 120
grab = false

[classifier]
double_tap_window_s = 0.25
press_threshold = 40

[profile]
preset = "xinput"

[journal]
enabled = true
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.input.delivery, Delivery::Polled);
        assert_eq!(config.input.poll_rate_hz, 120);
        assert!(!config.input.grab);
        assert_eq!(config.classifier.double_tap_window_s, 0.25);
        assert_eq!(config.classifier.press_threshold, 40);
        assert_eq!(config.classifier.release_threshold, 15);
        assert_eq!(config.profile.build().name(), "XInput");
        assert_eq!(config.journal.path, "./activations.jsonl");
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.classifier, ClassifierOptions::default());
        assert_eq!(config.input.poll_rate_hz, 60);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/crossbar.toml");
        assert!(matches!(result, Err(CrossbarError::Io(_))));
    }

    #[test]
    fn test_custom_profile_replaces_preset() {
        let config: Config = toml::from_str(
            r#"
[profile]
preset = "xinput"

[profile.custom]
name = "Fight stick"
buttons = [{ id = 9, role = "slot", slot = 2 }]
"#,
        )
        .unwrap();

        let profile = config.profile.build();
        assert_eq!(profile.name(), "Fight stick");
        assert!(profile.button_role(9).is_some());
    }

    #[test]
    fn test_invalid_custom_profile_is_config_error() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
[profile.custom]
name = "Broken"
buttons = [{ id = 9, role = "slot", slot = 0 }]
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[profile]\npreset = \"gamecube\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_poll_rate_zero() {
        let mut config = Config::default();
        config.input.poll_rate_hz = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_rate_too_high() {
        let mut config = Config::default();
        config.input.poll_rate_hz = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_journal_path_when_enabled() {
        let mut config = Config::default();
        config.journal.enabled = true;
        config.journal.path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_journal_path_when_disabled() {
        let mut config = Config::default();
        config.journal.path = String::new();
        assert!(config.validate().is_ok());
    }

    // ==================== ClassifierOptions Tests ====================

    #[test]
    fn test_sanitize_keeps_valid_options() {
        let options = ClassifierOptions::default();
        assert_eq!(options.sanitized(), options);
    }

    #[test]
    fn test_sanitize_inverted_thresholds() {
        let options = ClassifierOptions {
            press_threshold: 20,
            release_threshold: 20,
            ..ClassifierOptions::default()
        };
        let fixed = options.sanitized();
        assert_eq!(fixed.press_threshold, DEFAULT_PRESS_THRESHOLD);
        assert_eq!(fixed.release_threshold, DEFAULT_RELEASE_THRESHOLD);
    }

    #[test]
    fn test_sanitize_zero_release_threshold() {
        let options = ClassifierOptions {
            release_threshold: 0,
            ..ClassifierOptions::default()
        };
        assert_eq!(options.sanitized().release_threshold, DEFAULT_RELEASE_THRESHOLD);
    }

    #[test]
    fn test_sanitize_negative_window() {
        let options = ClassifierOptions {
            double_tap_window_s: -1.0,
            ..ClassifierOptions::default()
        };
        assert_eq!(options.sanitized().double_tap_window_s, 0.3);
    }

    #[test]
    fn test_sanitize_nan_window() {
        let options = ClassifierOptions {
            double_tap_window_s: f64::NAN,
            ..ClassifierOptions::default()
        };
        assert_eq!(options.sanitized().double_tap_window(), Duration::from_millis(300));
    }

    #[test]
    fn test_sanitize_oversized_window() {
        let options = ClassifierOptions {
            double_tap_window_s: 1e30,
            ..ClassifierOptions::default()
        };
        let fixed = options.sanitized();
        assert_eq!(fixed.double_tap_window_s, 0.3);
        assert_eq!(fixed.double_tap_window(), Duration::from_millis(300));
    }

    #[test]
    fn test_sanitize_keeps_window_at_cap() {
        let options = ClassifierOptions {
            double_tap_window_s: MAX_DOUBLE_TAP_WINDOW_S,
            ..ClassifierOptions::default()
        };
        assert_eq!(options.sanitized().double_tap_window(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_window_is_kept() {
        let options = ClassifierOptions {
            double_tap_window_s: 0.0,
            ..ClassifierOptions::default()
        };
        assert_eq!(options.sanitized().double_tap_window(), Duration::ZERO);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_poll_rate_hz(), 60);
        assert_eq!(default_double_tap_window_s(), 0.3);
        assert_eq!(default_press_threshold(), 30);
        assert_eq!(default_release_threshold(), 15);
        assert_eq!(default_min_pressed_display_ms(), 100);
        assert_eq!(default_journal_path(), "./activations.jsonl");
    }
}
