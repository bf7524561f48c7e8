//! Stability gate: sliding-window filter turning a noisy fused stream into a
//! validated / not-validated decision
//!
//! Pass requires BOTH:
//! - the current run of frames ≥ threshold is at least `required_frames` long
//! - drift (max - min over the whole window) ≤ `drift_tolerance`

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::{GateResult, Hint, ScoreSample, ValidationMode};
use crate::{
    GATE_DRIFT_TOLERANCE, GATE_MAX_WINDOW, GATE_REQUIRED_FRAMES, HINT_LOW_OBJECT,
    HINT_STRICT_HAND, HINT_STRICT_WEAK_SIGNAL,
};

/// Gate tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Consecutive frames at or above threshold needed to pass
    pub required_frames: u32,
    /// Window capacity
    pub max_window: usize,
    /// Max allowed drift over the window
    pub drift_tolerance: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            required_frames: GATE_REQUIRED_FRAMES,
            max_window: GATE_MAX_WINDOW,
            drift_tolerance: GATE_DRIFT_TOLERANCE,
        }
    }
}

/// Bounded FIFO of the most recent fused scores
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the oldest value first when full
    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Length of the run of values ≥ threshold ending at the newest value
    pub fn streak_at_or_above(&self, threshold: f64) -> u32 {
        self.values
            .iter()
            .rev()
            .take_while(|v| **v >= threshold)
            .count() as u32
    }

    /// max - min over the window (0.0 when empty)
    pub fn drift(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let (min, max) = self
            .values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        max - min
    }

    /// Values, oldest first
    pub fn values(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Stability gate; exclusively owns its window
#[derive(Debug, Clone)]
pub struct StabilityGate {
    config: GateConfig,
    window: SlidingWindow,
}

impl Default for StabilityGate {
    fn default() -> Self {
        Self::new()
    }
}

impl StabilityGate {
    /// Create gate with default tuning (12 frames, window 18, drift 0.10)
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    pub fn with_config(config: GateConfig) -> Self {
        Self {
            window: SlidingWindow::new(config.max_window),
            config,
        }
    }

    /// Push one frame and evaluate the gate
    pub fn push(
        &mut self,
        scores: &ScoreSample,
        fused: f64,
        threshold: f64,
        mode: ValidationMode,
    ) -> GateResult {
        self.window.push(fused);

        let stable_count = self.window.streak_at_or_above(threshold);
        let drift = self.window.drift();
        let passed =
            stable_count >= self.config.required_frames && drift <= self.config.drift_tolerance;

        let hint = self.select_hint(scores, fused, threshold, mode, passed, drift);

        debug!(
            "gate: fused={:.3} threshold={:.2} stable={} drift={:.3} passed={} hint={}",
            fused,
            threshold,
            stable_count,
            drift,
            passed,
            hint.code()
        );

        GateResult {
            passed,
            stable_count,
            drift,
            hint,
        }
    }

    /// First matching branch wins; branches overlap, so order matters
    fn select_hint(
        &self,
        scores: &ScoreSample,
        fused: f64,
        threshold: f64,
        mode: ValidationMode,
        passed: bool,
        drift: f64,
    ) -> Hint {
        let strict_hand_missing =
            mode == ValidationMode::Strict && scores.hand_object_iou < HINT_STRICT_HAND;

        if passed {
            Hint::H001_READY
        } else if scores.object_confidence < HINT_LOW_OBJECT {
            Hint::H002_LOW_LIGHT
        } else if strict_hand_missing
            && (scores.object_confidence < HINT_STRICT_WEAK_SIGNAL
                || scores.text_image_similarity < HINT_STRICT_WEAK_SIGNAL)
        {
            Hint::H003_BRING_HAND_CLOSER
        } else if strict_hand_missing {
            Hint::H004_MOVE_CLOSER
        } else if drift > self.config.drift_tolerance {
            Hint::H005_HOLD_STEADY
        } else if fused < threshold {
            Hint::H004_MOVE_CLOSER
        } else {
            Hint::H006_KEEP_HOLDING
        }
    }

    /// Empty the window; the next push behaves as on a new gate
    pub fn reset(&mut self) {
        debug!("gate: window reset ({} values dropped)", self.window.len());
        self.window.clear();
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

// =============================================================================
// TESTS
// =============================================================================
