//! Endpoint configuration and HTTP client construction

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use heyi_core::MAX_TEXT_CHARS;

/// Where the collaborators live and how long to wait for them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Job-queue endpoint of the text classifier
    pub text_job_url: String,
    /// Request/response endpoint of the image classifier
    pub image_url: String,
    /// Base URL of the scan ledger (also serves the flag lookup)
    pub ledger_base_url: String,
    /// Timeout for request/response calls, in seconds
    pub request_timeout_secs: u64,
    /// Bounded wait for the text result stream, in seconds
    pub stream_timeout_secs: u64,
    /// Text longer than this is cut before submission
    pub max_text_chars: usize,
    pub user_agent: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            text_job_url: "https://toothsocket-heyi-detector.hf.space/gradio_api/call/analyze_text"
                .to_string(),
            image_url: "https://heyi-a7j1.onrender.com/api/verify-image".to_string(),
            ledger_base_url: "https://heyi-a7j1.onrender.com".to_string(),
            request_timeout_secs: 30,
            stream_timeout_secs: 30,
            max_text_chars: MAX_TEXT_CHARS,
            user_agent: concat!("heyi/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl EndpointConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self, NetError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| NetError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, NetError> {
        toml::from_str(raw).map_err(|e| NetError::Config(e.to_string()))
    }

    /// Point every collaborator at one local server (tests, self-hosting)
    pub fn local(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            text_job_url: format!("{}/gradio_api/call/analyze_text", base),
            image_url: format!("{}/api/verify-image", base),
            ledger_base_url: base.to_string(),
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    /// Stream channel for a submitted text job
    pub fn text_stream_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.text_job_url.trim_end_matches('/'), event_id)
    }

    pub fn ledger_url(&self, path: &str) -> String {
        format!("{}{}", self.ledger_base_url.trim_end_matches('/'), path)
    }
}

/// Errors from HTTP plumbing
#[derive(Debug, Error)]
pub enum NetError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Create the HTTP client used for every collaborator call
pub fn create_client(config: &EndpointConfig) -> Result<Client, NetError> {
    Client::builder()
        .timeout(config.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| NetError::ClientBuild(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EndpointConfig::default();
        assert!(config.text_job_url.ends_with("/analyze_text"));
        assert_eq!(config.stream_timeout_secs, 30);
        assert_eq!(config.max_text_chars, 10_000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EndpointConfig::from_toml_str(
            r#"
            image_url = "http://localhost:3000/api/verify-image"
            stream_timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.image_url, "http://localhost:3000/api/verify-image");
        assert_eq!(config.stream_timeout(), Duration::from_secs(5));
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = EndpointConfig::from_toml_str("stream_timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, NetError::Config(_)));
    }

    #[test]
    fn test_local_urls() {
        let config = EndpointConfig::local("http://127.0.0.1:9000/");
        assert_eq!(
            config.text_stream_url("abc123"),
            "http://127.0.0.1:9000/gradio_api/call/analyze_text/abc123"
        );
        assert_eq!(
            config.ledger_url("/api/scan-text"),
            "http://127.0.0.1:9000/api/scan-text"
        );
    }

    #[test]
    fn test_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heyi.toml");
        std::fs::write(&path, "max_text_chars = 500\n").unwrap();

        let config = EndpointConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.max_text_chars, 500);

        assert!(EndpointConfig::from_toml_file(&dir.path().join("missing.toml")).is_err());
    }
}
