//! Page content extraction
//!
//! Fetches the resource and pulls out the text and image references the
//! classifiers are fed with.

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use heyi_core::ScanRequest;

use crate::{create_client, EndpointConfig, NetError};

/// Text blocks this short are navigation, labels and icons
const MIN_BLOCK_CHARS: usize = 60;

/// Images at or below this many px² are treated as icons
const MIN_IMAGE_AREA: u64 = 10_000;

/// Errors from content extraction
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{0}")]
    NotScannable(String),

    #[error("Failed to fetch page: {0}")]
    Fetch(String),

    #[error("Page returned status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of the content for the active resource
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, resource_id: &str) -> Result<ScanRequest, ExtractionError>;
}

/// Thread-safe reference to a content extractor
pub type SharedExtractor = Arc<dyn ContentExtractor>;

/// Extracts content by fetching the resource over HTTP and parsing its HTML
pub struct HtmlContentExtractor {
    client: Client,
}

impl HtmlContentExtractor {
    pub fn new(config: &EndpointConfig) -> Result<Self, NetError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }
}

#[async_trait]
impl ContentExtractor for HtmlContentExtractor {
    async fn extract(&self, resource_id: &str) -> Result<ScanRequest, ExtractionError> {
        let url = scannable_url(resource_id)?;

        debug!("Extracting content from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            warn!("Extraction of {} returned status: {}", url, response.status());
            return Err(ExtractionError::Status(response.status().as_u16()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ExtractionError::Fetch(e.to_string()))?;
        let (text, images) = extract_content(&html, &url)?;

        debug!(
            "Extracted {} chars and {} images from {}",
            text.chars().count(),
            images.len(),
            url
        );

        Ok(ScanRequest {
            resource_id: resource_id.to_string(),
            text,
            images,
        })
    }
}

/// Only web pages can be scanned
fn scannable_url(resource_id: &str) -> Result<Url, ExtractionError> {
    let not_scannable = || ExtractionError::NotScannable("Cannot scan system pages.".to_string());
    let url = Url::parse(resource_id).map_err(|_| not_scannable())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(not_scannable()),
    }
}

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Parse(e.to_string()))
}

/// Extract text blocks and ranked image references from HTML
pub fn extract_content(html: &str, base: &Url) -> Result<(String, Vec<String>), ExtractionError> {
    let document = Html::parse_document(html);

    let blocks: Vec<String> = document
        .select(&selector("h1, p")?)
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|text| text.chars().count() > MIN_BLOCK_CHARS)
        .collect();

    let mut sized = Vec::new();
    let mut unsized_images = Vec::new();

    for img in document.select(&selector("img")?) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        let Ok(resolved) = base.join(src.trim()) else {
            continue;
        };
        if !resolved.as_str().starts_with("http") {
            continue;
        }

        let width = img.value().attr("width").and_then(parse_dimension);
        let height = img.value().attr("height").and_then(parse_dimension);

        match (width, height) {
            (Some(w), Some(h)) => {
                let area = w.saturating_mul(h);
                if area > MIN_IMAGE_AREA {
                    sized.push((area, resolved.to_string()));
                }
            }
            _ => unsized_images.push(resolved.to_string()),
        }
    }

    // Largest first; stable, so equal areas keep document order
    sized.sort_by(|a, b| b.0.cmp(&a.0));

    let images = sized
        .into_iter()
        .map(|(_, src)| src)
        .chain(unsized_images)
        .collect();

    Ok((blocks.join("\n\n"), images))
}

fn parse_dimension(raw: &str) -> Option<u64> {
    raw.trim().trim_end_matches("px").parse().ok()
}

/// Normalize whitespace in text
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LONG: &str = "This paragraph is comfortably longer than sixty characters, so it is kept.";

    fn base() -> Url {
        Url::parse("https://shop.example.com/products/lamp").unwrap()
    }

    #[test]
    fn test_extract_keeps_long_blocks_only() {
        let html = format!(
            r#"<html><body>
                <nav><p>Home</p></nav>
                <h1>{LONG}</h1>
                <div>{LONG}</div>
                <p>Short caption</p>
                <p>{LONG}</p>
            </body></html>"#
        );

        let (text, images) = extract_content(&html, &base()).unwrap();
        assert_eq!(text, format!("{LONG}\n\n{LONG}"));
        assert!(images.is_empty());
    }

    #[test]
    fn test_images_ranked_by_area() {
        let html = r#"<html><body>
            <img src="/icon.png" width="32" height="32">
            <img src="/medium.jpg" width="200" height="100">
            <img src="https://cdn.example.com/hero.jpg" width="1200" height="600">
            <img src="/banner.png">
            <img src="data:image/png;base64,AAAA" width="500" height="500">
            <img alt="no source">
        </body></html>"#;

        let (_, images) = extract_content(html, &base()).unwrap();
        assert_eq!(
            images,
            vec![
                "https://cdn.example.com/hero.jpg".to_string(),
                "https://shop.example.com/medium.jpg".to_string(),
                "https://shop.example.com/banner.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_system_pages_are_not_scannable() {
        for id in ["chrome://extensions", "about:blank", "not a url"] {
            let err = scannable_url(id).unwrap_err();
            assert_eq!(err.to_string(), "Cannot scan system pages.");
        }
        assert!(scannable_url("https://example.com").is_ok());
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello \n\t world  "), "hello world");
    }

    #[tokio::test]
    async fn test_extract_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<html><body><p>{LONG}</p><img src="/hero.png" width="400" height="300"></body></html>"#
            )))
            .mount(&server)
            .await;

        let extractor = HtmlContentExtractor::new(&EndpointConfig::default()).unwrap();
        let resource_id = format!("{}/article", server.uri());
        let request = extractor.extract(&resource_id).await.unwrap();

        assert_eq!(request.resource_id, resource_id);
        assert_eq!(request.text, LONG);
        assert_eq!(request.primary_image(), Some(format!("{}/hero.png", server.uri()).as_str()));
    }

    #[tokio::test]
    async fn test_extract_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = HtmlContentExtractor::new(&EndpointConfig::default()).unwrap();
        let err = extractor.extract(&format!("{}/gone", server.uri())).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Status(404)));
    }
}
