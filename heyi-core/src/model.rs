//! Scan domain model
//!
//! Page content coming in, signal outcomes in the middle, one blended result
//! coming out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{blend, Score};

/// Which classifier produced a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Text,
    Image,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Text => "text",
            SignalKind::Image => "image",
        }
    }
}

/// Content extracted from the resource being scanned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Stable identity of the resource (canonical URL)
    pub resource_id: String,
    /// Concatenated page text
    pub text: String,
    /// Image references, most prominent first
    pub images: Vec<String>,
}

impl ScanRequest {
    pub fn new(resource_id: &str, text: &str) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            text: text.to_string(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, reference: &str) -> Self {
        self.images.push(reference.to_string());
        self
    }

    /// The dominant image, if the page has one
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Result of one classification signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalOutcome {
    pub kind: SignalKind,
    pub score: Score,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl SignalOutcome {
    pub fn image(score: Score, reasoning: &str) -> Self {
        Self {
            kind: SignalKind::Image,
            score,
            reasoning: Some(reasoning.to_string()),
        }
    }

    /// Image outcome for a page with no eligible image
    pub fn no_image() -> Self {
        Self::image(Score::Value(0.0), "")
    }

    pub fn is_error(&self) -> bool {
        self.score.is_unavailable()
    }
}

/// The single confidence produced for a scan, as stored for restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendedResult {
    pub resource_id: String,
    pub confidence: Score,
    pub text_score: Score,
    pub image_score: Score,
    #[serde(default)]
    pub reasoning: String,
    pub computed_at: DateTime<Utc>,
}

impl BlendedResult {
    /// Blend both signal outcomes into a result for `resource_id`
    pub fn compose(
        resource_id: &str,
        text_score: Score,
        image: &SignalOutcome,
        has_image: bool,
    ) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            confidence: blend(text_score, image, has_image),
            text_score,
            image_score: image.score,
            reasoning: image.reasoning.clone().unwrap_or_default(),
            computed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        !self.confidence.is_unavailable()
    }

    /// Per-signal breakdown, e.g. `Text = 80% | Image = 60%`
    pub fn breakdown(&self) -> String {
        let reasoning = if self.reasoning.is_empty() {
            "No image analyzed."
        } else {
            self.reasoning.as_str()
        };
        format!(
            "Text = {}% | Image = {}%\n{}",
            self.text_score.display_value().round(),
            self.image_score.display_value().round(),
            reasoning
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_image_is_first() {
        let request = ScanRequest::new("https://example.com/a", "text")
            .with_image("https://cdn.example.com/big.png")
            .with_image("https://cdn.example.com/small.png");
        assert_eq!(request.primary_image(), Some("https://cdn.example.com/big.png"));
        assert_eq!(ScanRequest::new("x", "y").primary_image(), None);
    }

    #[test]
    fn test_compose_two_signals() {
        let image = SignalOutcome::image(Score::Value(60.0), "Plastic skin texture.");
        let result = BlendedResult::compose("https://example.com", Score::Value(80.0), &image, true);

        assert_eq!(result.confidence, Score::Value(70.0));
        assert!(result.is_success());
        assert_eq!(result.reasoning, "Plastic skin texture.");
    }

    #[test]
    fn test_breakdown_hides_sentinel() {
        let image = SignalOutcome::image(Score::Value(40.0), "");
        let result = BlendedResult::compose("https://example.com", Score::Unavailable, &image, true);

        assert!(!result.is_success());
        assert_eq!(result.breakdown(), "Text = 0% | Image = 40%\nNo image analyzed.");
    }

    #[test]
    fn test_result_serializes_sentinel_as_number() {
        let result = BlendedResult::compose(
            "https://example.com",
            Score::Unavailable,
            &SignalOutcome::no_image(),
            false,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["confidence"], serde_json::json!(-1.0));
        assert_eq!(json["resourceId"], "https://example.com");

        let back: BlendedResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
