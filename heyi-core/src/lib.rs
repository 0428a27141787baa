//! HEYI Core - Score model and result storage for AI-content detection
//!
//! This crate provides the foundational primitives:
//! - Typed signal scores with an "unavailable" state
//! - Signal outcomes and the blended scan result
//! - The score blender and text truncation
//! - Result storage for restore-on-reopen

pub mod score;
pub mod model;
pub mod blend;
pub mod store;

pub use score::*;
pub use model::*;
pub use blend::*;
pub use store::*;

/// Wire value meaning "signal unavailable"
pub const ERROR_SENTINEL: f64 = -1.0;

/// Maximum characters of page text sent to the text classifier
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Confidence at or above which a page is reported as likely AI
pub const AI_THRESHOLD: f64 = 50.0;

/// Lowest valid confidence
pub const MIN_SCORE: f64 = 0.0;

/// Highest valid confidence
pub const MAX_SCORE: f64 = 100.0;
