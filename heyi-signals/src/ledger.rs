//! Scan ledger client
//!
//! Archives individual signal results in the document store behind the
//! backend's CRUD endpoints. Scores travel as `0..=1` fractions.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use heyi_core::{truncate_text, Score, SignalKind};
use heyi_net::{create_client, EndpointConfig, NetError};

use crate::{ScanLedger, SignalError};

/// Characters of page text kept as the text fingerprint
const TEXT_HASH_CHARS: usize = 50;

/// One signal result headed for the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub kind: SignalKind,
    /// Resource id for text results, image reference for image results
    pub subject: String,
    /// Score as a fraction in `0..=1`
    pub ai_score: f64,
    /// Leading page text, text results only
    pub text_hash: Option<String>,
}

impl LedgerEntry {
    /// Entry for a text result; `None` when the signal was unavailable
    pub fn text(resource_id: &str, text: &str, score: Score) -> Option<Self> {
        Some(Self {
            kind: SignalKind::Text,
            subject: resource_id.to_string(),
            ai_score: score.as_fraction()?,
            text_hash: Some(truncate_text(text, TEXT_HASH_CHARS).to_string()),
        })
    }

    /// Entry for an image result; `None` when the signal was unavailable
    pub fn image(image_ref: &str, score: Score) -> Option<Self> {
        Some(Self {
            kind: SignalKind::Image,
            subject: image_ref.to_string(),
            ai_score: score.as_fraction()?,
            text_hash: None,
        })
    }
}

/// Ledger reached over HTTP
pub struct HttpScanLedger {
    client: Client,
    config: EndpointConfig,
}

impl HttpScanLedger {
    pub fn new(config: EndpointConfig) -> Result<Self, NetError> {
        Ok(Self {
            client: create_client(&config)?,
            config,
        })
    }
}

#[async_trait]
impl ScanLedger for HttpScanLedger {
    async fn record(&self, entry: &LedgerEntry) -> Result<(), SignalError> {
        let (path, body) = match entry.kind {
            SignalKind::Text => (
                "/api/scan-text",
                json!({
                    "url": entry.subject,
                    "textHash": entry.text_hash.as_deref().unwrap_or_default(),
                    "aiScore": entry.ai_score,
                }),
            ),
            SignalKind::Image => (
                "/api/scan-image",
                json!({
                    "imageHash": entry.subject,
                    "aiScore": entry.ai_score,
                    "metadataFound": false,
                }),
            ),
        };

        self.client
            .post(self.config.ledger_url(path))
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SignalError::Ledger(e.to_string()))?;

        debug!("{} scan saved to ledger", entry.kind.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_entries_skip_unavailable_scores() {
        assert!(LedgerEntry::text("https://a", "text", Score::Unavailable).is_none());
        assert!(LedgerEntry::image("https://a/x.png", Score::Unavailable).is_none());

        let entry = LedgerEntry::text("https://a", &"y".repeat(80), Score::Value(85.0)).unwrap();
        assert_eq!(entry.ai_score, 0.85);
        assert_eq!(entry.text_hash.as_deref().map(str::len), Some(50));
    }

    #[tokio::test]
    async fn test_text_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/scan-text"))
            .and(body_json(json!({
                "url": "https://example.com/post",
                "textHash": "Once upon a time",
                "aiScore": 0.5,
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let ledger = HttpScanLedger::new(EndpointConfig::local(&server.uri())).unwrap();
        let entry =
            LedgerEntry::text("https://example.com/post", "Once upon a time", Score::Value(50.0))
                .unwrap();
        ledger.record(&entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_image_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/scan-image"))
            .and(body_json(json!({
                "imageHash": "https://cdn.example.com/a.png",
                "aiScore": 0.25,
                "metadataFound": false,
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let ledger = HttpScanLedger::new(EndpointConfig::local(&server.uri())).unwrap();
        let entry = LedgerEntry::image("https://cdn.example.com/a.png", Score::Value(25.0)).unwrap();
        ledger.record(&entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_ledger_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ledger = HttpScanLedger::new(EndpointConfig::local(&server.uri())).unwrap();
        let entry = LedgerEntry::image("https://cdn.example.com/a.png", Score::Value(25.0)).unwrap();
        assert!(matches!(ledger.record(&entry).await, Err(SignalError::Ledger(_))));
    }
}
