//! TOML configuration: default mode plus fusion, gate and capture tuning.
//!
//! Every section is `#[serde(default)]`, so a file only needs the keys it
//! overrides. Durations are seconds.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::{FusionConfig, GateConfig, LoopConfig, TriggerPolicy};
use crate::error::ShutterError;
use crate::types::ValidationMode;
use crate::{
    ALMOST_THERE_PROGRESS, AUTO_CAPTURE_COOLDOWN_MS, AUTO_CAPTURE_HOLD_MS, DETECT_OBJECT_ABOVE,
    DETECT_TEXT_ABOVE, PROGRESS_BOOST,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ShutterConfig {
    #[serde(default)]
    pub mode: ValidationMode,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub progress_boost: f64,
    pub almost_there: f64,
    pub detect_text_above: f64,
    pub detect_object_above: f64,
    /// Seconds of continuous detection before the timer fires
    pub auto_capture_hold_secs: f64,
    /// Seconds the timer stays disarmed after any trigger
    pub auto_capture_cooldown_secs: f64,
    pub trigger_policy: TriggerPolicy,
    pub latch_until_reset: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            progress_boost: PROGRESS_BOOST,
            almost_there: ALMOST_THERE_PROGRESS,
            detect_text_above: DETECT_TEXT_ABOVE,
            detect_object_above: DETECT_OBJECT_ABOVE,
            auto_capture_hold_secs: AUTO_CAPTURE_HOLD_MS as f64 / 1000.0,
            auto_capture_cooldown_secs: AUTO_CAPTURE_COOLDOWN_MS as f64 / 1000.0,
            trigger_policy: TriggerPolicy::default(),
            latch_until_reset: true,
        }
    }
}

impl ShutterConfig {
    /// Read, parse and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ShutterError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ShutterError> {
        let config: ShutterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ShutterError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ShutterError> {
        let f = &self.fusion;
        let unit = [
            ("fusion.threshold_strict", f.threshold_strict),
            ("fusion.threshold_standard", f.threshold_standard),
            ("fusion.threshold_lenient", f.threshold_lenient),
            ("fusion.strict_floor", f.strict_floor),
            ("fusion.standard_weight_object", f.standard_weight_object),
            ("fusion.standard_weight_text", f.standard_weight_text),
            ("fusion.fallback_hand_below", f.fallback_hand_below),
            ("fusion.fallback_object_min", f.fallback_object_min),
            ("fusion.fallback_text_min", f.fallback_text_min),
            ("fusion.fallback_weight_object", f.fallback_weight_object),
            ("fusion.fallback_weight_text", f.fallback_weight_text),
            ("gate.drift_tolerance", self.gate.drift_tolerance),
            ("capture.almost_there", self.capture.almost_there),
            ("capture.detect_text_above", self.capture.detect_text_above),
            ("capture.detect_object_above", self.capture.detect_object_above),
        ];
        for (key, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{} must be within [0, 1], got {}", key, value)));
            }
        }

        for (key, value) in [
            ("fusion.strict_exp_object", f.strict_exp_object),
            ("fusion.strict_exp_hand", f.strict_exp_hand),
            ("fusion.strict_exp_text", f.strict_exp_text),
            ("capture.progress_boost", self.capture.progress_boost),
            ("capture.auto_capture_hold_secs", self.capture.auto_capture_hold_secs),
            ("capture.auto_capture_cooldown_secs", self.capture.auto_capture_cooldown_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be non-negative, got {}", key, value)));
            }
        }

        if self.gate.required_frames < 1 {
            return Err(invalid("gate.required_frames must be at least 1".to_string()));
        }
        if self.gate.max_window < self.gate.required_frames as usize {
            return Err(invalid(format!(
                "gate.max_window ({}) must be >= gate.required_frames ({})",
                self.gate.max_window, self.gate.required_frames
            )));
        }
        Ok(())
    }

    /// Loop tuning derived from this config
    pub fn loop_config(&self) -> LoopConfig {
        let c = &self.capture;
        LoopConfig {
            fusion: self.fusion.clone(),
            gate: self.gate.clone(),
            progress_boost: c.progress_boost,
            almost_there: c.almost_there,
            detect_text_above: c.detect_text_above,
            detect_object_above: c.detect_object_above,
            auto_capture_hold: secs(c.auto_capture_hold_secs),
            auto_capture_cooldown: secs(c.auto_capture_cooldown_secs),
            trigger_policy: c.trigger_policy,
            latch_until_reset: c.latch_until_reset,
        }
    }
}

// Unvalidated negative or NaN seconds collapse to zero
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn invalid(reason: String) -> ShutterError {
    ShutterError::InvalidConfig(reason)
}
