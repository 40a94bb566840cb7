//! Reliability scoring for extracted text.
//!
//! A score combines up to four normalized signals:
//!
//! - **Density** `D`: non-whitespace characters over a normalization constant,
//!   clamped to 1.
//! - **Wordiness** `W`: share of letter-only, case-folded tokens that are stop
//!   words. Natural prose scores high, garbled recognition output low.
//! - **Repetition** `R`: `1 - top_char_count / non_whitespace_chars`. Output
//!   dominated by one symbol (blank or noisy scans) scores low.
//! - **Recognition confidence** `C`: 1 for textual methods; approximated by
//!   `D` for visual-recognition methods.
//!
//! Textual methods weigh `0.5D + 0.3W + 0.2R`, visual-recognition methods
//! `0.4D + 0.2W + 0.2R + 0.2C`.

mod stopwords;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::types::{Method, Reliability};

pub use stopwords::is_stop_word;

/// Default character count at which density saturates.
pub const DEFAULT_DENSITY_NORM: f64 = 400.0;

/// Raw sub-signals of a score, exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Signals {
    pub density: f64,
    pub wordiness: f64,
    pub repetition: f64,
}

/// Deterministic text reliability scorer.
#[derive(Debug, Clone, Copy)]
pub struct ReliabilityScorer {
    density_norm: f64,
}

impl Default for ReliabilityScorer {
    fn default() -> Self {
        Self {
            density_norm: DEFAULT_DENSITY_NORM,
        }
    }
}

impl ReliabilityScorer {
    /// Create a scorer with a custom density normalization constant.
    pub fn with_density_norm(density_norm: f64) -> Self {
        Self {
            density_norm: if density_norm > 0.0 {
                density_norm
            } else {
                DEFAULT_DENSITY_NORM
            },
        }
    }

    /// Compute the sub-signals for a block of text.
    pub fn signals(&self, text: &str) -> Signals {
        let mut counts: HashMap<char, usize> = HashMap::new();
        let mut total = 0usize;
        for ch in text.chars().filter(|c| !c.is_whitespace()) {
            *counts.entry(ch).or_insert(0) += 1;
            total += 1;
        }
        if total == 0 {
            return Signals::default();
        }

        let density = (total as f64 / self.density_norm).min(1.0);
        let top = counts.values().copied().max().unwrap_or(0);
        let repetition = 1.0 - top as f64 / total as f64;

        Signals {
            density,
            wordiness: wordiness(text),
            repetition,
        }
    }

    /// Score `text` as produced by `method`.
    pub fn score(&self, text: &str, method: Method) -> Reliability {
        let s = self.signals(text);
        let raw = if method.uses_visual_recognition() {
            let confidence = s.density;
            0.4 * s.density + 0.2 * s.wordiness + 0.2 * s.repetition + 0.2 * confidence
        } else {
            0.5 * s.density + 0.3 * s.wordiness + 0.2 * s.repetition
        };
        Reliability::new(raw)
    }
}

fn wordiness(text: &str) -> f64 {
    let mut tokens = 0usize;
    let mut stops = 0usize;
    for raw in text.split_whitespace() {
        let token: String = raw
            .chars()
            .filter(|c| c.is_alphabetic())
            .flat_map(char::to_lowercase)
            .collect();
        if token.is_empty() {
            continue;
        }
        tokens += 1;
        if is_stop_word(&token) {
            stops += 1;
        }
    }
    if tokens == 0 {
        0.0
    } else {
        stops as f64 / tokens as f64
    }
}

/// How per-unit scores collapse into the acceptance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateMode {
    /// Median of unit scores (robust to a few outlier pages).
    #[default]
    Median,
    /// Arithmetic mean.
    Mean,
    /// Weakest unit decides.
    Minimum,
}

impl FromStr for AggregateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "median" => Ok(AggregateMode::Median),
            "mean" => Ok(AggregateMode::Mean),
            "minimum" | "min" => Ok(AggregateMode::Minimum),
            other => Err(format!("unknown aggregate mode '{}'", other)),
        }
    }
}

/// Collapse scores with `mode`. An empty slice aggregates to 0.
pub fn aggregate(scores: &[f64], mode: AggregateMode) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    match mode {
        AggregateMode::Median => median(scores),
        AggregateMode::Mean => scores.iter().sum::<f64>() / scores.len() as f64,
        AggregateMode::Minimum => scores.iter().copied().fold(f64::INFINITY, f64::min),
    }
}

/// Median of a slice of scores; 0 when empty.
pub fn median(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Percentage (0-100) of scores at or above `threshold`.
pub fn share_at_or_above(scores: &[f64], threshold: f64) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let hits = scores.iter().filter(|s| **s >= threshold).count();
    hits as f64 * 100.0 / scores.len() as f64
}
