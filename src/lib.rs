//! semshutter: decision core of the semantic shutter
//!
//! Per frame: ScoreSample → fusion → StabilityGate → CaptureDecisionLoop → LoopEvent.
//! The core is synchronous, owns no threads and never fails; the host decides
//! how events propagate (direct call, channel, or the session API in `core::api`).

pub mod config;
pub mod core;
pub mod error;
pub mod types;

pub use error::ShutterError;

// =============================================================================
// FUSION THRESHOLDS
// =============================================================================

/// Activation threshold for Strict mode
pub const THRESHOLD_STRICT: f64 = 0.85;

/// Activation threshold for Standard mode
pub const THRESHOLD_STANDARD: f64 = 0.70;

/// Activation threshold for Lenient mode
pub const THRESHOLD_LENIENT: f64 = 0.55;

// =============================================================================
// FUSION WEIGHTS - empirical, kept configurable (see FusionConfig)
// =============================================================================

/// Strict geometric-mean exponents (object, hand, text)
pub const STRICT_EXP_OBJECT: f64 = 0.34;
pub const STRICT_EXP_HAND: f64 = 0.33;
pub const STRICT_EXP_TEXT: f64 = 0.33;

/// Floor applied to each strict factor before exponentiation
pub const STRICT_FACTOR_FLOOR: f64 = 0.0001;

/// Standard linear blend weights
pub const STANDARD_WEIGHT_OBJECT: f64 = 0.7;
pub const STANDARD_WEIGHT_TEXT: f64 = 0.3;

/// Hand-free fallback gates
pub const FALLBACK_HAND_BELOW: f64 = 0.15;
pub const FALLBACK_OBJECT_MIN: f64 = 0.75;
pub const FALLBACK_TEXT_MIN: f64 = 0.6;

/// Hand-free fallback weights
pub const FALLBACK_WEIGHT_OBJECT: f64 = 0.8;
pub const FALLBACK_WEIGHT_TEXT: f64 = 0.2;

// =============================================================================
// STABILITY GATE
// =============================================================================

/// Consecutive frames at or above threshold required to pass
pub const GATE_REQUIRED_FRAMES: u32 = 12;

/// Sliding window capacity
pub const GATE_MAX_WINDOW: usize = 18;

/// Max allowed (max - min) over the window
pub const GATE_DRIFT_TOLERANCE: f64 = 0.10;

/// Below this object confidence the scene is considered unlit / subject-less
pub const HINT_LOW_OBJECT: f64 = 0.28;

/// Strict mode: hand interaction below this produces a hand hint
pub const HINT_STRICT_HAND: f64 = 0.22;

/// Strict mode: object/text below this means "bring hand closer" instead of "move closer"
pub const HINT_STRICT_WEAK_SIGNAL: f64 = 0.6;

// =============================================================================
// CAPTURE LOOP
// =============================================================================

/// Progress = max(previous, min(1, fused * boost))
pub const PROGRESS_BOOST: f64 = 1.05;

/// One-shot "almost there" signal threshold on progress
pub const ALMOST_THERE_PROGRESS: f64 = 0.92;

/// Detection predicate: text similarity above this...
pub const DETECT_TEXT_ABOVE: f64 = 0.3;

/// ...or object confidence above this
pub const DETECT_OBJECT_ABOVE: f64 = 0.4;

/// Continuous detection required before auto-capture (milliseconds)
pub const AUTO_CAPTURE_HOLD_MS: u64 = 2000;

/// Auto-capture disarm period after firing (milliseconds)
pub const AUTO_CAPTURE_COOLDOWN_MS: u64 = 3000;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
