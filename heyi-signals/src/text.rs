//! Text signal client
//!
//! Two phases:
//! 1. POST the (truncated) text to the job queue, receive an `event_id`
//! 2. Read the server-sent event stream at `<job-url>/<event_id>` until the
//!    first `complete` or `error` event
//!
//! Transport and server failures make the signal unavailable. A completion
//! whose payload cannot be read scores 0 instead.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use heyi_core::{truncate_text, Score};
use heyi_net::{create_client, EndpointConfig, NetError};

use crate::{completion_percentage, SignalError, TextJobReply, TextJobRequest, TextSignal};

/// Slack given to the HTTP layer so the stream deadline fires first
const STREAM_GRACE: Duration = Duration::from_secs(5);

/// Client for the streaming text classifier
pub struct TextSignalClient {
    client: Client,
    config: EndpointConfig,
}

impl TextSignalClient {
    pub fn new(config: EndpointConfig) -> Result<Self, NetError> {
        Ok(Self {
            client: create_client(&config)?,
            config,
        })
    }

    /// Classify `text`, keeping the failure cause
    pub async fn classify(&self, text: &str) -> Result<f64, SignalError> {
        let event_id = self.submit_job(text).await?;
        debug!("Text job accepted: {}", event_id);

        tokio::time::timeout(self.config.stream_timeout(), self.await_completion(&event_id))
            .await
            .map_err(|_| SignalError::StreamTimeout(self.config.stream_timeout_secs))?
    }

    async fn submit_job(&self, text: &str) -> Result<String, SignalError> {
        let clean = truncate_text(text, self.config.max_text_chars);
        debug!(
            "Submitting {} of {} chars to {}",
            clean.chars().count(),
            text.chars().count(),
            self.config.text_job_url
        );

        let response = self
            .client
            .post(&self.config.text_job_url)
            .json(&TextJobRequest { data: [clean] })
            .send()
            .await
            .map_err(|e| SignalError::Submission(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SignalError::Submission(format!(
                "job queue returned status {}",
                response.status()
            )));
        }

        let reply: TextJobReply = response
            .json()
            .await
            .map_err(|e| SignalError::Submission(e.to_string()))?;

        reply
            .event_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SignalError::Submission("missing event_id".to_string()))
    }

    /// Resolves exactly once: on the first terminal event, or when the
    /// channel ends without one
    async fn await_completion(&self, event_id: &str) -> Result<f64, SignalError> {
        let url = self.config.text_stream_url(event_id);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .timeout(self.config.stream_timeout().saturating_add(STREAM_GRACE))
            .send()
            .await
            .map_err(|e| SignalError::Stream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SignalError::Stream(format!(
                "stream returned status {}",
                response.status()
            )));
        }

        let mut events = Box::pin(response.bytes_stream().eventsource());

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| SignalError::Stream(e.to_string()))?;

            match event.event.as_str() {
                "complete" => return Ok(read_completion(&event.data)),
                "error" => {
                    return Err(SignalError::Stream(format!("error event: {}", event.data)));
                }
                other => debug!("Ignoring {} event on {}", other, event_id),
            }
        }

        Err(SignalError::Stream(
            "channel closed without a terminal event".to_string(),
        ))
    }
}

/// Malformed completion payloads read as "no AI signature found"
fn read_completion(data: &str) -> f64 {
    match completion_percentage(data) {
        Some(percentage) => percentage,
        None => {
            warn!("Unexpected completion payload, scoring 0: {}", data);
            0.0
        }
    }
}

#[async_trait]
impl TextSignal for TextSignalClient {
    async fn submit_text(&self, text: &str) -> Score {
        match self.classify(text).await {
            Ok(percentage) => {
                let score = Score::clamped(percentage);
                info!("Text signal: {}", score);
                score
            }
            Err(e) => {
                warn!("Text signal unavailable: {}", e);
                Score::Unavailable
            }
        }
    }
}
