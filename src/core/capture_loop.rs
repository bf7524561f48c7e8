//! Capture decision loop: drives fusion → gate each frame and decides when to
//! fire the shutter
//!
//! Two cooperating mechanisms:
//! - progress ratchet: progress = max(progress, min(1, fused · 1.05)), reset only by `reset_cycle`
//! - dual trigger: gate passes (rising edge) OR the cheap detection predicate
//!   (text > 0.3 || object > 0.4) holds for 2.0s; after firing, the timer disarms for 3.0s
//!
//! One instance = one capture session. Calls must be serialized and in frame order.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::core::fusion::{fuse_with, FusionConfig};
use crate::core::source::ScoreSource;
use crate::core::stability::{GateConfig, StabilityGate};
use crate::error::ShutterError;
use crate::types::{CaptureState, LoopEvent, ScoreSample, TriggerSource, ValidationMode};
use crate::{
    ALMOST_THERE_PROGRESS, AUTO_CAPTURE_COOLDOWN_MS, AUTO_CAPTURE_HOLD_MS, DETECT_OBJECT_ABOVE,
    DETECT_TEXT_ABOVE, PROGRESS_BOOST,
};

/// Which trigger paths may fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Gate pass or duration timer, whichever comes first
    #[default]
    GateOrTimer,
    /// Gate only; the duration timer never fires
    GateOnly,
    /// Gate must pass while the detection has been held for the hold duration
    GateAndTimer,
}

/// Loop tuning
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    pub fusion: FusionConfig,
    pub gate: GateConfig,
    pub progress_boost: f64,
    pub almost_there: f64,
    pub detect_text_above: f64,
    pub detect_object_above: f64,
    pub auto_capture_hold: Duration,
    pub auto_capture_cooldown: Duration,
    pub trigger_policy: TriggerPolicy,
    /// Block every further trigger until `reset_cycle` (the "is capturing" latch)
    pub latch_until_reset: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            gate: GateConfig::default(),
            progress_boost: PROGRESS_BOOST,
            almost_there: ALMOST_THERE_PROGRESS,
            detect_text_above: DETECT_TEXT_ABOVE,
            detect_object_above: DETECT_OBJECT_ABOVE,
            auto_capture_hold: Duration::from_millis(AUTO_CAPTURE_HOLD_MS),
            auto_capture_cooldown: Duration::from_millis(AUTO_CAPTURE_COOLDOWN_MS),
            trigger_policy: TriggerPolicy::default(),
            latch_until_reset: true,
        }
    }
}

/// Capture decision loop for one session
#[derive(Debug)]
pub struct CaptureDecisionLoop {
    mode: ValidationMode,
    config: LoopConfig,
    gate: StabilityGate,
    state: CaptureState,
}

impl CaptureDecisionLoop {
    /// Create loop with default tuning
    pub fn new(mode: ValidationMode) -> Self {
        Self::with_config(mode, LoopConfig::default())
    }

    pub fn with_config(mode: ValidationMode, config: LoopConfig) -> Self {
        Self {
            mode,
            gate: StabilityGate::with_config(config.gate.clone()),
            config,
            state: CaptureState::default(),
        }
    }

    /// Process one frame at the current monotonic time
    pub fn on_frame(&mut self, sample: &ScoreSample) -> LoopEvent {
        self.on_frame_at(sample, Instant::now())
    }

    /// Process one frame observed at `now`
    pub fn on_frame_at(&mut self, sample: &ScoreSample, now: Instant) -> LoopEvent {
        let sample = sample.clamped();
        let mode = self.mode;
        let fusion = fuse_with(&sample, mode, &self.config.fusion);
        let gate = self
            .gate
            .push(&sample, fusion.fused, fusion.threshold, mode);

        let cfg = &self.config;
        let st = &mut self.state;
        st.frames += 1;

        // A regressing clock counts as no time passing
        let now = match st.last_frame_at {
            Some(prev) if now < prev => {
                warn!("capture: frame {} timestamp went backwards, clamping", st.frames);
                prev
            }
            _ => now,
        };
        st.last_frame_at = Some(now);

        // Progress ratchet
        let candidate = (fusion.fused * cfg.progress_boost).min(1.0);
        st.progress = st.progress.max(candidate);

        let almost_there = !st.almost_there_sent && st.progress >= cfg.almost_there;
        if almost_there {
            st.almost_there_sent = true;
            debug!("capture: almost there (progress={:.3})", st.progress);
        }

        if gate.passed && !st.is_verified {
            st.is_verified = true;
            info!(
                "capture: verified on frame {} (fused={:.3}, stable={})",
                st.frames, fusion.fused, gate.stable_count
            );
        }

        // Detection timer, no grace period on loss
        let detected = sample.text_image_similarity > cfg.detect_text_above
            || sample.object_confidence > cfg.detect_object_above;
        if detected {
            let start = *st.detection_start.get_or_insert(now);
            st.detection_elapsed = now.duration_since(start);
        } else {
            st.detection_start = None;
            st.detection_elapsed = Duration::ZERO;
        }

        if !st.auto_capture_armed {
            if let Some(at) = st.rearm_at {
                if now >= at {
                    st.auto_capture_armed = true;
                    st.rearm_at = None;
                    debug!("capture: auto-capture re-armed");
                }
            }
        }

        let held = detected && st.detection_elapsed >= cfg.auto_capture_hold;

        let gate_condition = match cfg.trigger_policy {
            TriggerPolicy::GateAndTimer => gate.passed && held,
            TriggerPolicy::GateOrTimer | TriggerPolicy::GateOnly => gate.passed,
        };
        let gate_edge = gate_condition && !st.gate_was_passing;
        st.gate_was_passing = gate_condition;

        let trigger = if cfg.latch_until_reset && st.capturing {
            None
        } else if gate_edge {
            Some(TriggerSource::Gate)
        } else if cfg.trigger_policy == TriggerPolicy::GateOrTimer
            && st.auto_capture_armed
            && held
        {
            Some(TriggerSource::Timer)
        } else {
            None
        };

        if let Some(source) = trigger {
            st.capturing = true;
            // Either path disarms the timer so the same held object cannot refire at once
            st.auto_capture_armed = false;
            st.rearm_at = Some(now + cfg.auto_capture_cooldown);
            info!(
                "capture: TRIGGER via {} on frame {} (fused={:.3}, progress={:.3}, held={}ms)",
                source,
                st.frames,
                fusion.fused,
                st.progress,
                st.detection_elapsed.as_millis()
            );
        }

        st.hint = gate.hint;
        st.last_fused = fusion.fused;
        st.last_threshold = fusion.threshold;
        st.last_stable_count = gate.stable_count;
        st.last_drift = gate.drift;

        let mut event = LoopEvent::from_state(st, mode);
        event.triggered = trigger.is_some();
        event.trigger = trigger;
        event.almost_there = almost_there;
        event
    }

    /// Restore the exact initial state (progress, verified, window, timer, arm flag, hint)
    pub fn reset_cycle(&mut self) {
        info!(
            "capture: cycle reset after {} frames (verified={}, capturing={})",
            self.state.frames, self.state.is_verified, self.state.capturing
        );
        self.state = CaptureState::default();
        self.gate.reset();
    }

    /// Drive the loop from a source. Frames without an offset are spaced by `frame_interval`.
    pub fn replay(
        &mut self,
        source: &mut dyn ScoreSource,
        start: Instant,
        frame_interval: Duration,
    ) -> Result<Vec<LoopEvent>, ShutterError> {
        let mut events = Vec::new();
        self.replay_each(source, start, frame_interval, |event| {
            events.push(event);
            Ok(())
        })?;
        Ok(events)
    }

    /// Like `replay`, handing each event to `on_event` as soon as it is produced.
    /// A source error stops the replay; events already handed off stay delivered.
    /// Returns the number of frames processed.
    pub fn replay_each<F>(
        &mut self,
        source: &mut dyn ScoreSource,
        start: Instant,
        frame_interval: Duration,
        mut on_event: F,
    ) -> Result<u32, ShutterError>
    where
        F: FnMut(LoopEvent) -> Result<(), ShutterError>,
    {
        let mut index: u32 = 0;
        while let Some(item) = source.next_sample() {
            let timed = item?;
            let at = start + timed.offset.unwrap_or(frame_interval * index);
            on_event(self.on_frame_at(&timed.sample, at))?;
            index = index.saturating_add(1);
        }
        Ok(index)
    }

    /// Current state rendered as an event, without advancing
    pub fn current_event(&self) -> LoopEvent {
        LoopEvent::from_state(&self.state, self.mode)
    }

    pub fn set_mode(&mut self, mode: ValidationMode) {
        if mode != self.mode {
            info!("capture: mode {} -> {}", self.mode, mode);
            self.mode = mode;
        }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn gate(&self) -> &StabilityGate {
        &self.gate
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn frame_count(&self) -> u64 {
        self.state.frames
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn is_verified(&self) -> bool {
        self.state.is_verified
    }
}

// =============================================================================
// TESTS
// =============================================================================
