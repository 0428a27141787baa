//! Confidence scores and verdicts
//!
//! A score is either a confidence in `[0, 100]` or `Unavailable`. On the wire
//! and on disk it is a plain number, with the sentinel `-1` standing for
//! `Unavailable`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AI_THRESHOLD, ERROR_SENTINEL, MAX_SCORE, MIN_SCORE};

/// Outcome of one classification signal, or of the blend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub enum Score {
    /// A valid confidence percentage
    Value(f64),
    /// The signal could not be obtained
    Unavailable,
}

impl Score {
    /// Build a score from a raw number. Negative values are the sentinel.
    pub fn from_raw(raw: f64) -> Self {
        if raw.is_nan() {
            return Score::Value(MIN_SCORE);
        }
        if raw < 0.0 {
            return Score::Unavailable;
        }
        Score::Value(raw.min(MAX_SCORE))
    }

    /// A classifier reading forced into the valid range; never the sentinel
    pub fn clamped(reading: f64) -> Self {
        if reading.is_nan() {
            return Score::Value(MIN_SCORE);
        }
        Score::Value(reading.clamp(MIN_SCORE, MAX_SCORE))
    }

    /// Raw number, `ERROR_SENTINEL` when unavailable
    pub fn as_raw(&self) -> f64 {
        match self {
            Score::Value(v) => *v,
            Score::Unavailable => ERROR_SENTINEL,
        }
    }

    /// The confidence if available
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Value(v) => Some(*v),
            Score::Unavailable => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Score::Unavailable)
    }

    /// Value shown to users: unavailable clamps to zero
    pub fn display_value(&self) -> f64 {
        self.value().unwrap_or(MIN_SCORE)
    }

    /// Confidence as a `0..=1` fraction, for the scan ledger
    pub fn as_fraction(&self) -> Option<f64> {
        self.value().map(|v| v / 100.0)
    }
}

impl Default for Score {
    fn default() -> Self {
        Score::Value(MIN_SCORE)
    }
}

impl From<f64> for Score {
    fn from(raw: f64) -> Self {
        Score::from_raw(raw)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.as_raw()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Value(v) => write!(f, "{}%", v.round()),
            Score::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// User-facing reading of a blended confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    LikelyAi,
    LikelyHuman,
    /// Analysis could not be completed
    Unreachable,
}

impl Verdict {
    pub fn from_confidence(confidence: Score) -> Self {
        match confidence {
            Score::Unavailable => Verdict::Unreachable,
            Score::Value(v) if v >= AI_THRESHOLD => Verdict::LikelyAi,
            Score::Value(_) => Verdict::LikelyHuman,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Verdict::LikelyAi => "Careful!",
            Verdict::LikelyHuman => "All good!",
            Verdict::Unreachable => "Oops!",
        }
    }

    /// One-line explanation for the verdict
    pub fn subtitle(&self, confidence: Score) -> String {
        match self {
            Verdict::LikelyAi => format!(
                "We are {}% sure this is AI.",
                confidence.display_value().round()
            ),
            Verdict::LikelyHuman => "Human-written content detected.".to_string(),
            Verdict::Unreachable => "Could not complete analysis.".to_string(),
        }
    }
}
