//! Validation mode definitions

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ShutterError;
use crate::{THRESHOLD_LENIENT, THRESHOLD_STANDARD, THRESHOLD_STRICT};

/// How strictly the three signals must jointly agree
///
/// Serialized lowercase; deserialized through `FromStr`, so settings labels and
/// any casing are accepted wherever a mode is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ValidationMode {
    /// Object, hand interaction and text must all be present (geometric mean)
    Strict,
    /// Object-weighted blend, hand ignored
    #[default]
    Standard,
    /// Semantic match only
    Lenient,
}

impl ValidationMode {
    pub const ALL: [ValidationMode; 3] = [
        ValidationMode::Strict,
        ValidationMode::Standard,
        ValidationMode::Lenient,
    ];

    /// Default activation threshold for this mode
    pub fn default_threshold(&self) -> f64 {
        match self {
            ValidationMode::Strict => THRESHOLD_STRICT,
            ValidationMode::Standard => THRESHOLD_STANDARD,
            ValidationMode::Lenient => THRESHOLD_LENIENT,
        }
    }

    /// Label used by the settings screen
    pub fn settings_label(&self) -> &'static str {
        match self {
            ValidationMode::Strict => "Strict (hand-object)",
            ValidationMode::Standard => "Standard (object)",
            ValidationMode::Lenient => "Lenient (semantic only)",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Strict => "strict",
            ValidationMode::Standard => "standard",
            ValidationMode::Lenient => "lenient",
        }
    }
}

impl FromStr for ValidationMode {
    type Err = ShutterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(mode) = Self::ALL.iter().find(|m| m.settings_label() == trimmed) {
            return Ok(*mode);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "standard" => Ok(ValidationMode::Standard),
            "lenient" => Ok(ValidationMode::Lenient),
            _ => Err(ShutterError::UnknownMode(trimmed.to_string())),
        }
    }
}

impl TryFrom<String> for ValidationMode {
    type Error = ShutterError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}
