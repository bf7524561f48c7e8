//! Per-frame perception signals and their fused value

use serde::{Deserialize, Serialize};

/// One frame's raw perception output (all values in 0.0-1.0)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    /// Likelihood the target object class is present
    pub object_confidence: f64,
    /// Hand-object interaction overlap
    pub hand_object_iou: f64,
    /// Semantic match between recognized content and target keywords
    pub text_image_similarity: f64,
    /// Best current guess of the subject (advisory only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_label: Option<String>,
}

impl ScoreSample {
    /// Create a sample without label
    pub fn new(object_confidence: f64, hand_object_iou: f64, text_image_similarity: f64) -> Self {
        Self {
            object_confidence,
            hand_object_iou,
            text_image_similarity,
            semantic_label: None,
        }
    }

    /// Attach an advisory label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.semantic_label = Some(label.into());
        self
    }

    /// Copy with every score forced into 0.0-1.0 (NaN → 0.0)
    pub fn clamped(&self) -> Self {
        Self {
            object_confidence: clamp_unit(self.object_confidence),
            hand_object_iou: clamp_unit(self.hand_object_iou),
            text_image_similarity: clamp_unit(self.text_image_similarity),
            semantic_label: self.semantic_label.clone(),
        }
    }
}

/// Clamp into 0.0-1.0; a single noisy frame must never poison the window
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Output of the fusion policy for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fusion {
    /// Fused confidence: 0.0-1.0
    pub fused: f64,
    /// Activation threshold of the mode used
    pub threshold: f64,
    /// Did the hand-free fallback raise the result?
    pub fallback_applied: bool,
}

impl Fusion {
    pub fn clears_threshold(&self) -> bool {
        self.fused >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_out_of_range() {
        let s = ScoreSample::new(1.4, -0.2, f64::NAN).clamped();
        assert_eq!(s.object_confidence, 1.0);
        assert_eq!(s.hand_object_iou, 0.0);
        assert_eq!(s.text_image_similarity, 0.0);
    }

    #[test]
    fn test_label_survives_clamp() {
        let s = ScoreSample::new(0.5, 0.5, 0.5).with_label("moon").clamped();
        assert_eq!(s.semantic_label.as_deref(), Some("moon"));
    }

    #[test]
    fn test_label_optional_in_json() {
        let s: ScoreSample = serde_json::from_str(
            r#"{"object_confidence":0.9,"hand_object_iou":0.1,"text_image_similarity":0.8}"#,
        )
        .unwrap();
        assert!(s.semantic_label.is_none());
        let json = serde_json::to_string(&s).unwrap();
        assert!(!json.contains("semantic_label"));
    }
}
