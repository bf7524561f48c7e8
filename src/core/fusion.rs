//! Fusion policy: three sub-scores → one confidence under a validation mode
//!
//! - STRICT:   obj^0.34 · hand^0.33 · text^0.33 (each factor floored at 0.0001)
//! - STANDARD: min(1, 0.7·obj + 0.3·text)
//! - LENIENT:  text
//!
//! All modes then apply the hand-free fallback: hand < 0.15, obj ≥ 0.75 and
//! text ≥ 0.6 → fused = max(fused, 0.8·obj + 0.2·text).

use serde::{Deserialize, Serialize};

use crate::types::{clamp_unit, Fusion, ScoreSample, ValidationMode};
use crate::{
    FALLBACK_HAND_BELOW, FALLBACK_OBJECT_MIN, FALLBACK_TEXT_MIN, FALLBACK_WEIGHT_OBJECT,
    FALLBACK_WEIGHT_TEXT, STANDARD_WEIGHT_OBJECT, STANDARD_WEIGHT_TEXT, STRICT_EXP_HAND,
    STRICT_EXP_OBJECT, STRICT_EXP_TEXT, STRICT_FACTOR_FLOOR, THRESHOLD_LENIENT,
    THRESHOLD_STANDARD, THRESHOLD_STRICT,
};

/// Tuning for the fusion policy. Defaults are the empirical values above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub threshold_strict: f64,
    pub threshold_standard: f64,
    pub threshold_lenient: f64,
    pub strict_exp_object: f64,
    pub strict_exp_hand: f64,
    pub strict_exp_text: f64,
    pub strict_floor: f64,
    pub standard_weight_object: f64,
    pub standard_weight_text: f64,
    pub fallback_hand_below: f64,
    pub fallback_object_min: f64,
    pub fallback_text_min: f64,
    pub fallback_weight_object: f64,
    pub fallback_weight_text: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            threshold_strict: THRESHOLD_STRICT,
            threshold_standard: THRESHOLD_STANDARD,
            threshold_lenient: THRESHOLD_LENIENT,
            strict_exp_object: STRICT_EXP_OBJECT,
            strict_exp_hand: STRICT_EXP_HAND,
            strict_exp_text: STRICT_EXP_TEXT,
            strict_floor: STRICT_FACTOR_FLOOR,
            standard_weight_object: STANDARD_WEIGHT_OBJECT,
            standard_weight_text: STANDARD_WEIGHT_TEXT,
            fallback_hand_below: FALLBACK_HAND_BELOW,
            fallback_object_min: FALLBACK_OBJECT_MIN,
            fallback_text_min: FALLBACK_TEXT_MIN,
            fallback_weight_object: FALLBACK_WEIGHT_OBJECT,
            fallback_weight_text: FALLBACK_WEIGHT_TEXT,
        }
    }
}

impl FusionConfig {
    /// Activation threshold for a mode
    pub fn threshold(&self, mode: ValidationMode) -> f64 {
        match mode {
            ValidationMode::Strict => self.threshold_strict,
            ValidationMode::Standard => self.threshold_standard,
            ValidationMode::Lenient => self.threshold_lenient,
        }
    }
}

/// Fuse with the default tuning
pub fn fuse(scores: &ScoreSample, mode: ValidationMode) -> Fusion {
    fuse_with(scores, mode, &FusionConfig::default())
}

/// Fuse with explicit tuning. Pure; never fails.
pub fn fuse_with(scores: &ScoreSample, mode: ValidationMode, config: &FusionConfig) -> Fusion {
    let obj = clamp_unit(scores.object_confidence);
    let hand = clamp_unit(scores.hand_object_iou);
    let text = clamp_unit(scores.text_image_similarity);

    let base = match mode {
        ValidationMode::Strict => {
            let floor = config.strict_floor;
            obj.max(floor).powf(config.strict_exp_object)
                * hand.max(floor).powf(config.strict_exp_hand)
                * text.max(floor).powf(config.strict_exp_text)
        }
        ValidationMode::Standard => {
            (config.standard_weight_object * obj + config.standard_weight_text * text).min(1.0)
        }
        ValidationMode::Lenient => text,
    };

    let mut fused = base;
    let mut fallback_applied = false;

    // Hand-free targets (screens, the moon) must not be blocked by the hand term
    if hand < config.fallback_hand_below
        && obj >= config.fallback_object_min
        && text >= config.fallback_text_min
    {
        let fallback = config.fallback_weight_object * obj + config.fallback_weight_text * text;
        if fallback > fused {
            fused = fallback;
            fallback_applied = true;
        }
    }

    Fusion {
        fused: clamp_unit(fused),
        threshold: config.threshold(mode),
        fallback_applied,
    }
}

/// Stateless wrapper holding a tuning, for hosts that pass the policy around
#[derive(Debug, Clone, Default)]
pub struct FusionPolicy {
    config: FusionConfig,
}

impl FusionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn fuse(&self, scores: &ScoreSample, mode: ValidationMode) -> Fusion {
        fuse_with(scores, mode, &self.config)
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }
}

// =============================================================================
// TESTS
// =============================================================================
