//! Script-based language detection
//!
//! Counts code points in the Odia Unicode block against all alphabetic
//! characters. This is a coarse heuristic: Desia is usually written in Odia
//! script and cannot be told apart from Odia, and the confidence is a ratio,
//! not a probability.

use serde::Serialize;
use std::ops::RangeInclusive;

use crate::core::models::LanguageCode;

/// Odia Unicode block
pub const ODIA_BLOCK: RangeInclusive<char> = '\u{0B00}'..='\u{0B7F}';

/// Share of Odia characters above which text is classified as Odia
pub const ODIA_THRESHOLD: f64 = 0.2;

/// Detection outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    /// Detected language
    pub language: LanguageCode,
    /// Odia ratio for Odia, its complement for English
    pub confidence: f64,
}

/// Heuristic classifier over Unicode script ranges
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptDetector;

impl ScriptDetector {
    /// Create a detector
    pub fn new() -> Self {
        Self
    }

    /// Ratio of Odia-block characters to alphabetic characters
    ///
    /// Odia combining signs sit in the block but are not all alphabetic, so
    /// the raw ratio can exceed 1.0; it is clamped.
    pub fn odia_ratio(&self, text: &str) -> f64 {
        let odia_chars = text.chars().filter(|c| ODIA_BLOCK.contains(c)).count();
        let alpha_chars = text.chars().filter(|c| c.is_alphabetic()).count().max(1);

        (odia_chars as f64 / alpha_chars as f64).min(1.0)
    }

    /// Classify text as Odia or English
    pub fn detect(&self, text: &str) -> Detection {
        let ratio = self.odia_ratio(text);

        if ratio > ODIA_THRESHOLD {
            Detection {
                language: LanguageCode::Odia,
                confidence: ratio,
            }
        } else {
            Detection {
                language: LanguageCode::English,
                confidence: 1.0 - ratio,
            }
        }
    }
}
