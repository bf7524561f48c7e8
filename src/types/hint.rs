//! Diagnostic hints explaining why the gate has (not) passed

use serde::{Deserialize, Serialize};

/// Hint codes, in the order the gate evaluates them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum Hint {
    // =========================================================================
    // H000: No frame yet
    // =========================================================================
    /// Nothing observed in this cycle
    H000_WAITING,

    // =========================================================================
    // H001: Passed
    // =========================================================================
    /// Gate passed, capture can proceed
    H001_READY,

    // =========================================================================
    // H002-H004: Scene / framing
    // =========================================================================
    /// Object confidence too low to say anything
    H002_LOW_LIGHT,
    /// Strict mode: hand far from target and the target itself is weak
    H003_BRING_HAND_CLOSER,
    /// Slightly more evidence needed
    H004_MOVE_CLOSER,

    // =========================================================================
    // H005-H006: Temporal
    // =========================================================================
    /// Window drift above tolerance
    H005_HOLD_STEADY,
    /// Above threshold, streak still building
    H006_KEEP_HOLDING,
}

impl Hint {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::H000_WAITING => "H000_WAITING",
            Self::H001_READY => "H001_READY",
            Self::H002_LOW_LIGHT => "H002_LOW_LIGHT",
            Self::H003_BRING_HAND_CLOSER => "H003_BRING_HAND_CLOSER",
            Self::H004_MOVE_CLOSER => "H004_MOVE_CLOSER",
            Self::H005_HOLD_STEADY => "H005_HOLD_STEADY",
            Self::H006_KEEP_HOLDING => "H006_KEEP_HOLDING",
        }
    }

    /// Text shown to the user
    pub fn text(&self) -> &'static str {
        match self {
            Self::H000_WAITING => "Point at the target",
            Self::H001_READY => "Stable, ready",
            Self::H002_LOW_LIGHT => "Insufficient light / no clear subject",
            Self::H003_BRING_HAND_CLOSER => "Bring hand closer to target",
            Self::H004_MOVE_CLOSER => "Move slightly closer",
            Self::H005_HOLD_STEADY => "Hold steady ~1s",
            Self::H006_KEEP_HOLDING => "Keep holding",
        }
    }
}

impl std::fmt::Display for Hint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.text())
    }
}

/// Per-frame output of the stability gate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Streak and drift requirements both hold
    pub passed: bool,
    /// Current run of consecutive frames at or above threshold
    pub stable_count: u32,
    /// max - min over the whole window
    pub drift: f64,
    /// Why (not) passed
    pub hint: Hint,
}

impl GateResult {
    /// Human-readable text of the hint
    pub fn hint_text(&self) -> &'static str {
        self.hint.text()
    }
}
