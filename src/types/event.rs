//! Capture loop state and per-frame events

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::types::{Hint, ValidationMode};

/// Which path fired the capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    /// Stability gate passed
    Gate,
    /// Detection held for the auto-capture duration
    Timer,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::Gate => write!(f, "GATE"),
            TriggerSource::Timer => write!(f, "TIMER"),
        }
    }
}

/// State owned by one capture cycle; `Default` is the initial state
#[derive(Debug, Clone)]
pub struct CaptureState {
    /// Monotonic non-decreasing within a cycle
    pub progress: f64,
    /// Gate has passed at least once this cycle
    pub is_verified: bool,
    /// First frame of the current continuous detection
    pub detection_start: Option<Instant>,
    /// How long the detection predicate has held
    pub detection_elapsed: Duration,
    /// Duration-based auto-capture may fire
    pub auto_capture_armed: bool,
    /// When a disarmed timer re-arms
    pub rearm_at: Option<Instant>,
    /// A trigger fired and the cycle has not been reset
    pub capturing: bool,
    /// "Almost there" already signalled this cycle
    pub almost_there_sent: bool,
    /// Gate result of the previous frame (rising-edge detection)
    pub gate_was_passing: bool,
    /// Last hint shown
    pub hint: Hint,
    /// Last fused score
    pub last_fused: f64,
    /// Threshold used on the last frame
    pub last_threshold: f64,
    /// Last gate streak / drift
    pub last_stable_count: u32,
    pub last_drift: f64,
    /// Timestamp of the last frame
    pub last_frame_at: Option<Instant>,
    /// Frames processed this cycle
    pub frames: u64,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self {
            progress: 0.0,
            is_verified: false,
            detection_start: None,
            detection_elapsed: Duration::ZERO,
            auto_capture_armed: true,
            rearm_at: None,
            capturing: false,
            almost_there_sent: false,
            gate_was_passing: false,
            hint: Hint::H000_WAITING,
            last_fused: 0.0,
            last_threshold: 0.0,
            last_stable_count: 0,
            last_drift: 0.0,
            last_frame_at: None,
            frames: 0,
        }
    }
}

/// Output of the capture loop for each frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopEvent {
    /// Wall-clock time for display
    pub timestamp: DateTime<Utc>,
    /// Frame index within the cycle (1-based, 0 before any frame)
    pub frame: u64,
    /// Mode used for this frame
    pub mode: ValidationMode,
    /// Fused score and its threshold
    pub fused: f64,
    pub threshold: f64,
    /// Progress ring value (0.0-1.0)
    pub progress: f64,
    /// Gate has passed this cycle
    pub is_verified: bool,
    /// Gate streak and window drift
    pub stable_count: u32,
    pub drift: f64,
    /// Hint text for the user
    pub hint: String,
    /// Hint code
    pub reason: Hint,
    /// Capture fired on this frame
    pub triggered: bool,
    /// Path that fired, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerSource>,
    /// Progress crossed the "almost there" level on this frame (once per cycle)
    pub almost_there: bool,
    /// Continuous detection duration
    pub detection_elapsed_ms: u64,
    /// Auto-capture timer armed
    pub auto_capture_armed: bool,
}

impl LoopEvent {
    /// Render a state as an event (no trigger, no one-shot signals)
    pub fn from_state(state: &CaptureState, mode: ValidationMode) -> Self {
        Self {
            timestamp: Utc::now(),
            frame: state.frames,
            mode,
            fused: state.last_fused,
            threshold: state.last_threshold,
            progress: state.progress,
            is_verified: state.is_verified,
            stable_count: state.last_stable_count,
            drift: state.last_drift,
            hint: state.hint.text().to_string(),
            reason: state.hint,
            triggered: false,
            trigger: None,
            almost_there: false,
            detection_elapsed_ms: state.detection_elapsed.as_millis() as u64,
            auto_capture_armed: state.auto_capture_armed,
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let line = format!(
            "#{:<4} fused={:.3}/{:.2} | progress={:>3.0}% | stable={:>2} | drift={:.3} | {}",
            self.frame,
            self.fused,
            self.threshold,
            self.progress * 100.0,
            self.stable_count,
            self.drift,
            self.hint
        );
        if self.triggered {
            format!("{} {}", line.green().bold(), "● CAPTURE".green().bold())
        } else if self.is_verified {
            line.green().to_string()
        } else if self.reason == Hint::H002_LOW_LIGHT {
            line.red().to_string()
        } else if self.progress >= 0.5 {
            line.yellow().to_string()
        } else {
            line.bright_black().to_string()
        }
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "frame={} | mode={} | fused={:.3} | threshold={:.2} | progress={:.3} | stable={} | drift={:.3} | verified={} | triggered={} | trigger={} | reason={}",
            self.frame,
            self.mode.as_str(),
            self.fused,
            self.threshold,
            self.progress,
            self.stable_count,
            self.drift,
            self.is_verified,
            self.triggered,
            self.trigger.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string()),
            self.reason.code()
        )
    }
}
