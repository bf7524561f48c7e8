//! Sample parser: text line protocol for score samples
//!
//! Accepted forms:
//! - `obj=0.92 hand=0.10 text=0.81 label="coffee cup"` (any order, label optional)
//! - `0.92 0.10 0.81` (object, hand, text)

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ShutterError;
use crate::types::ScoreSample;

lazy_static! {
    // key=value pairs; value is a number, a quoted string or a bare word
    static ref RE_PAIR: Regex = Regex::new(
        r#"(?i)\b(obj|object|hand|iou|text|sim|label)\s*=\s*("([^"]*)"|[^\s]+)"#
    ).unwrap();

    static ref RE_BARE: Regex = Regex::new(
        r"^\s*([-+]?\d*\.?\d+(?:[eE][-+]?\d+)?)\s+([-+]?\d*\.?\d+(?:[eE][-+]?\d+)?)\s+([-+]?\d*\.?\d+(?:[eE][-+]?\d+)?)\s*$"
    ).unwrap();
}

/// Parser for operator-typed or recorded sample lines
#[derive(Debug, Default)]
pub struct SampleParser;

impl SampleParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one line. Errors carry line 0; callers attach the real line.
    pub fn parse(&self, line: &str) -> Result<ScoreSample, ShutterError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(invalid("empty line"));
        }

        if let Some(caps) = RE_BARE.captures(line) {
            return Ok(ScoreSample::new(
                parse_score(&caps[1])?,
                parse_score(&caps[2])?,
                parse_score(&caps[3])?,
            ));
        }

        let mut object = None;
        let mut hand = None;
        let mut text = None;
        let mut label = None;

        for caps in RE_PAIR.captures_iter(line) {
            let key = caps[1].to_ascii_lowercase();
            let raw = caps.get(3).map(|m| m.as_str()).unwrap_or(&caps[2]);
            match key.as_str() {
                "obj" | "object" => object = Some(parse_score(raw)?),
                "hand" | "iou" => hand = Some(parse_score(raw)?),
                "text" | "sim" => text = Some(parse_score(raw)?),
                "label" => label = Some(raw.to_string()),
                _ => {}
            }
        }

        let sample = ScoreSample {
            object_confidence: object.ok_or_else(|| invalid("missing obj="))?,
            hand_object_iou: hand.ok_or_else(|| invalid("missing hand="))?,
            text_image_similarity: text.ok_or_else(|| invalid("missing text="))?,
            semantic_label: label,
        };
        Ok(sample)
    }
}

fn parse_score(raw: &str) -> Result<f64, ShutterError> {
    raw.parse::<f64>()
        .map_err(|_| invalid(&format!("not a number: {}", raw)))
}

fn invalid(reason: &str) -> ShutterError {
    ShutterError::InvalidSample {
        line: 0,
        reason: reason.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
