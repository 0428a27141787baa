//! Image signal client
//!
//! One request/response call per scan, for the page's dominant image.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use heyi_core::{Score, SignalOutcome};
use heyi_net::{create_client, EndpointConfig, NetError};

use crate::{read_percentage, ImageSignal, ImageVerifyReply, ImageVerifyRequest, SignalError};

/// Reasoning reported when the image server answers with an error status
pub const SERVER_ERROR_REASON: &str = "Failed to verify image due to a server error.";

/// Reasoning reported when the image server cannot be reached
pub const CONNECT_ERROR_REASON: &str = "Failed to connect to the image analysis server.";

/// Reasoning used when the server sends none
pub const NO_REASONING: &str = "No reasoning provided.";

/// Client for the image verification endpoint
pub struct ImageSignalClient {
    client: Client,
    config: EndpointConfig,
}

impl ImageSignalClient {
    pub fn new(config: EndpointConfig) -> Result<Self, NetError> {
        Ok(Self {
            client: create_client(&config)?,
            config,
        })
    }

    /// Verify one image, keeping the failure cause
    pub async fn classify(&self, image_url: &str) -> Result<(f64, String), SignalError> {
        debug!("Verifying image {}", image_url);

        let response = self
            .client
            .post(&self.config.image_url)
            .json(&ImageVerifyRequest { image_url })
            .send()
            .await
            .map_err(|e| SignalError::ImageTransport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SignalError::ImageStatus(response.status().as_u16()));
        }

        let reply: ImageVerifyReply = response
            .json()
            .await
            .map_err(|e| SignalError::ImageTransport(e.to_string()))?;

        let percentage = reply
            .ai_percentage
            .as_ref()
            .and_then(read_percentage)
            .unwrap_or(0.0);
        let reasoning = reply
            .reasoning
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| NO_REASONING.to_string());

        Ok((percentage, reasoning))
    }
}

#[async_trait]
impl ImageSignal for ImageSignalClient {
    async fn submit_image(&self, reference: Option<&str>) -> SignalOutcome {
        let Some(image_url) = reference.filter(|r| !r.is_empty()) else {
            return SignalOutcome::no_image();
        };

        match self.classify(image_url).await {
            Ok((percentage, reasoning)) => {
                let score = Score::clamped(percentage);
                info!("Image signal: {}", score);
                SignalOutcome::image(score, &reasoning)
            }
            Err(e) => {
                warn!("Image signal unavailable: {}", e);
                let reason = match e {
                    SignalError::ImageStatus(_) => SERVER_ERROR_REASON,
                    _ => CONNECT_ERROR_REASON,
                };
                SignalOutcome::image(Score::Unavailable, reason)
            }
        }
    }
}
