//! Common traits for signal sources

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use heyi_core::{Score, SignalOutcome};

use crate::LedgerEntry;

/// Errors from signal and ledger calls
///
/// A malformed completion payload is not an error: it reads as a zero score.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Stream failed: {0}")]
    Stream(String),

    #[error("Stream timed out after {0} seconds")]
    StreamTimeout(u64),

    #[error("Image server returned status {0}")]
    ImageStatus(u16),

    #[error("Image transport failed: {0}")]
    ImageTransport(String),

    #[error("Ledger write failed: {0}")]
    Ledger(String),
}

/// Text classification signal
#[async_trait]
pub trait TextSignal: Send + Sync {
    /// Confidence for `text`, `Score::Unavailable` when the signal failed
    async fn submit_text(&self, text: &str) -> Score;
}

/// Image classification signal
#[async_trait]
pub trait ImageSignal: Send + Sync {
    /// Outcome for one image reference; no reference is a zero score
    async fn submit_image(&self, reference: Option<&str>) -> SignalOutcome;
}

/// Long-term archive of individual signal results
#[async_trait]
pub trait ScanLedger: Send + Sync {
    async fn record(&self, entry: &LedgerEntry) -> Result<(), SignalError>;
}

pub type SharedTextSignal = Arc<dyn TextSignal>;
pub type SharedImageSignal = Arc<dyn ImageSignal>;
pub type SharedLedger = Arc<dyn ScanLedger>;
