//! Integration tests for the capture decision loop
//!
//! Tests the full path: sample → fusion → gate → CaptureDecisionLoop → LoopEvent.
//! Time is injected through `on_frame_at`, so nothing sleeps.

use pretty_assertions::assert_eq;
use semshutter::core::{CaptureDecisionLoop, LoopConfig, TriggerPolicy};
use semshutter::types::{Hint, LoopEvent, ScoreSample, TriggerSource, ValidationMode};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(100);

/// Detected (object > 0.4) but far below any threshold: the gate never passes
fn held_weak() -> ScoreSample {
    ScoreSample::new(0.5, 0.0, 0.0)
}

fn run(capture: &mut CaptureDecisionLoop, sample: &ScoreSample, frames: u32) -> Vec<LoopEvent> {
    let t0 = Instant::now();
    (0..frames)
        .map(|i| capture.on_frame_at(sample, t0 + TICK * i))
        .collect()
}

fn trigger_times(events: &[LoopEvent]) -> Vec<(u64, Option<TriggerSource>)> {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.triggered)
        .map(|(i, e)| (i as u64 * 100, e.trigger))
        .collect()
}

/// Timer fires exactly at 2.0s of continuous detection; latched, it never fires again
#[test]
fn test_timer_fires_once_at_hold_duration() {
    let mut capture = CaptureDecisionLoop::new(ValidationMode::Standard);
    let events = run(&mut capture, &held_weak(), 80);

    assert_eq!(trigger_times(&events), vec![(2000, Some(TriggerSource::Timer))]);
    assert!(!capture.is_verified());

    let fired = &events[20];
    assert_eq!(fired.detection_elapsed_ms, 2000);
    assert!(!fired.auto_capture_armed);
}

/// Without the latch, the cooldown still blocks refiring until 3.0s later
#[test]
fn test_timer_cooldown_without_latch() {
    let config = LoopConfig {
        latch_until_reset: false,
        ..Default::default()
    };
    let mut capture = CaptureDecisionLoop::with_config(ValidationMode::Standard, config);
    let events = run(&mut capture, &held_weak(), 60);

    assert_eq!(
        trigger_times(&events),
        vec![
            (2000, Some(TriggerSource::Timer)),
            (5000, Some(TriggerSource::Timer)),
        ]
    );
    for event in &events[21..50] {
        assert!(!event.auto_capture_armed);
    }
}

/// A hold lost and renewed during the cooldown completes its 2.0s but still waits for re-arm
#[test]
fn test_renewed_hold_does_not_retrigger_during_cooldown() {
    let config = LoopConfig {
        latch_until_reset: false,
        ..Default::default()
    };
    let mut capture = CaptureDecisionLoop::with_config(ValidationMode::Standard, config);
    let t0 = Instant::now();
    let held = held_weak();
    let nothing = ScoreSample::new(0.1, 0.0, 0.1);

    let events: Vec<LoopEvent> = (0..60u32)
        .map(|i| {
            let sample = if i == 21 { &nothing } else { &held };
            capture.on_frame_at(sample, t0 + TICK * i)
        })
        .collect();

    // Renewed hold starts at frame 22 and reaches 2.0s at frame 42, inside the cooldown
    assert!(events[42].detection_elapsed_ms >= 2000);
    assert!(!events[42].triggered);
    assert_eq!(
        trigger_times(&events),
        vec![
            (2000, Some(TriggerSource::Timer)),
            (5000, Some(TriggerSource::Timer)),
        ]
    );
}

/// Losing detection restarts the hold from zero
#[test]
fn test_detection_loss_restarts_hold() {
    let mut capture = CaptureDecisionLoop::new(ValidationMode::Standard);
    let t0 = Instant::now();
    let nothing = ScoreSample::new(0.1, 0.0, 0.1);

    for i in 0..15u32 {
        capture.on_frame_at(&held_weak(), t0 + TICK * i);
    }
    let lost = capture.on_frame_at(&nothing, t0 + TICK * 15);
    assert_eq!(lost.detection_elapsed_ms, 0);

    let mut fired_at = None;
    for i in 16..60u32 {
        if capture.on_frame_at(&held_weak(), t0 + TICK * i).triggered {
            fired_at = Some(i);
            break;
        }
    }
    // Hold restarts at frame 16, so 2.0s later is frame 36
    assert_eq!(fired_at, Some(36));
}

/// Steady strong signal fires through the gate before the timer can
#[test]
fn test_gate_trigger_beats_timer() {
    let mut capture = CaptureDecisionLoop::new(ValidationMode::Standard);
    let events = run(&mut capture, &ScoreSample::new(0.9, 0.0, 0.9), 40);

    assert_eq!(trigger_times(&events), vec![(1100, Some(TriggerSource::Gate))]);
    let fired = &events[11];
    assert!(fired.is_verified);
    assert_eq!(fired.stable_count, 12);
    assert_eq!(fired.reason, Hint::H001_READY);
}

/// Gate-and-timer waits for both conditions
#[test]
fn test_gate_and_timer_policy() {
    let config = LoopConfig {
        trigger_policy: TriggerPolicy::GateAndTimer,
        ..Default::default()
    };
    let mut capture = CaptureDecisionLoop::with_config(ValidationMode::Standard, config);
    let events = run(&mut capture, &ScoreSample::new(0.9, 0.0, 0.9), 40);

    // Verified on frame 12, but the shot waits for the 2.0s hold
    assert!(events[11].is_verified);
    assert!(!events[11].triggered);
    assert_eq!(trigger_times(&events), vec![(2000, Some(TriggerSource::Gate))]);
}

/// Progress only rises within a cycle and returns to 0 on reset
#[test]
fn test_progress_monotonic_and_reset() {
    let mut capture = CaptureDecisionLoop::new(ValidationMode::Lenient);
    let t0 = Instant::now();
    let texts = [0.2, 0.5, 0.3, 0.7, 0.1, 0.6, 0.0];

    let mut previous = 0.0;
    for (i, text) in texts.iter().enumerate() {
        let event = capture.on_frame_at(&ScoreSample::new(0.0, 0.0, *text), t0 + TICK * i as u32);
        assert!(event.progress >= previous);
        assert!(event.progress <= 1.0);
        previous = event.progress;
    }
    assert!((previous - 0.735).abs() < 1e-9);

    capture.reset_cycle();
    let event = capture.current_event();
    assert_eq!(event.progress, 0.0);
    assert!(!event.is_verified);
    assert!(event.auto_capture_armed);
    assert_eq!(event.reason, Hint::H000_WAITING);
    assert_eq!(capture.gate().window_len(), 0);
}

/// Verification stays true for the rest of the cycle once the gate passed
#[test]
fn test_verified_is_sticky_until_reset() {
    let mut capture = CaptureDecisionLoop::new(ValidationMode::Standard);
    let t0 = Instant::now();
    let strong = ScoreSample::new(0.9, 0.0, 0.9);
    for i in 0..12u32 {
        capture.on_frame_at(&strong, t0 + TICK * i);
    }
    assert!(capture.is_verified());

    let event = capture.on_frame_at(&ScoreSample::new(0.1, 0.0, 0.1), t0 + TICK * 12);
    assert!(event.is_verified);
    assert_eq!(event.reason, Hint::H002_LOW_LIGHT);

    capture.reset_cycle();
    assert!(!capture.is_verified());
}

/// After reset the whole cycle replays identically
#[test]
fn test_reset_allows_next_capture() {
    let mut capture = CaptureDecisionLoop::new(ValidationMode::Standard);
    let strong = ScoreSample::new(0.9, 0.0, 0.9);

    let first = run(&mut capture, &strong, 20);
    capture.reset_cycle();
    let second = run(&mut capture, &strong, 20);

    assert_eq!(trigger_times(&first), trigger_times(&second));
    assert_eq!(second[0].frame, 1);
}

/// Almost-there fires once per cycle
#[test]
fn test_almost_there_once_per_cycle() {
    let mut capture = CaptureDecisionLoop::new(ValidationMode::Standard);
    let events = run(&mut capture, &ScoreSample::new(0.9, 0.0, 0.9), 30);
    let count = events.iter().filter(|e| e.almost_there).count();
    assert_eq!(count, 1);
    assert!(events[0].almost_there);
}
