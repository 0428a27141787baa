//! Orchestration Controller
//!
//! Owns the scan lifecycle for one presentation surface:
//!
//! ```text
//! Idle --start_scan--> Scanning --> Settled(Success | Failure) --reset--> Idle
//! Idle --restore (hit)--> Settled
//! ```
//!
//! A scan extracts the page, runs the text and image signals concurrently and
//! joins both, blends them, stores the result for restore, and hands the
//! individual signal results to the ledger queue without waiting on it.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use heyi_core::{BlendedResult, ScanRequest, SharedStore, Verdict};
use heyi_net::{EndpointConfig, HtmlContentExtractor, NetError, SharedExtractor};
use heyi_signals::{
    HttpScanLedger, ImageSignalClient, LedgerEntry, SharedImageSignal, SharedLedger,
    SharedTextSignal, TextSignalClient,
};

use crate::LedgerQueue;

/// Capacity of the lifecycle event channel
const EVENT_CAPACITY: usize = 64;

/// Why a scan settled as a failure
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The resource could not be extracted; no signal was queried
    ContentUnavailable(String),
    /// At least one required signal was unavailable
    AnalysisFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Success,
    Failure(FailureReason),
}

/// A finished (or restored) scan
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    pub resource_id: String,
    pub settlement: Settlement,
    /// Absent only when extraction failed
    pub result: Option<BlendedResult>,
}

impl Settled {
    fn from_result(result: BlendedResult) -> Self {
        let settlement = if result.is_success() {
            Settlement::Success
        } else {
            Settlement::Failure(FailureReason::AnalysisFailed)
        };
        Self {
            resource_id: result.resource_id.clone(),
            settlement,
            result: Some(result),
        }
    }

    pub fn is_success(&self) -> bool {
        self.settlement == Settlement::Success
    }

    /// Confidence to show; every failure shows 0
    pub fn display_confidence(&self) -> f64 {
        match (&self.settlement, &self.result) {
            (Settlement::Success, Some(result)) => result.confidence.display_value(),
            _ => 0.0,
        }
    }

    pub fn verdict(&self) -> Verdict {
        match (&self.settlement, &self.result) {
            (Settlement::Success, Some(result)) => Verdict::from_confidence(result.confidence),
            _ => Verdict::Unreachable,
        }
    }
}

/// Lifecycle state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning {
        scan_id: Uuid,
        resource_id: String,
    },
    Settled(Settled),
}

impl ScanState {
    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Scanning { .. } => "scanning",
            ScanState::Settled(_) => "settled",
        }
    }
}

/// Events emitted to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Started { scan_id: Uuid, resource_id: String },
    Settled(Settled),
    Restored(Settled),
    Reset { resource_id: String },
}

/// Rejected lifecycle transitions
#[derive(Debug, Error, PartialEq)]
pub enum ControllerError {
    #[error("A scan is already in progress for {0}")]
    ScanInProgress(String),

    #[error("Controller is not idle (state: {0}); reset first")]
    NotIdle(&'static str),

    #[error("Nothing to reset (state: {0})")]
    NotSettled(&'static str),

    #[error("Result store error: {0}")]
    Store(String),
}

/// Collaborators of a controller
pub struct ControllerConfig {
    pub extractor: SharedExtractor,
    pub text: SharedTextSignal,
    pub image: SharedImageSignal,
    pub store: SharedStore,
    pub ledger: SharedLedger,
}

impl ControllerConfig {
    /// HTTP collaborators for every signal, the extractor and the ledger
    pub fn http(endpoints: &EndpointConfig, store: SharedStore) -> Result<Self, NetError> {
        Ok(Self {
            extractor: Arc::new(HtmlContentExtractor::new(endpoints)?),
            text: Arc::new(TextSignalClient::new(endpoints.clone())?),
            image: Arc::new(ImageSignalClient::new(endpoints.clone())?),
            store,
            ledger: Arc::new(HttpScanLedger::new(endpoints.clone())?),
        })
    }
}

/// Returns the controller to `Idle` if a scan future is dropped mid-flight
struct ScanGuard<'a> {
    state: &'a Mutex<ScanState>,
    armed: bool,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Scan abandoned before settling");
            *self.state.lock() = ScanState::Idle;
        }
    }
}

/// The scan state machine
pub struct OrchestrationController {
    extractor: SharedExtractor,
    text: SharedTextSignal,
    image: SharedImageSignal,
    store: SharedStore,
    ledger: LedgerQueue,
    state: Mutex<ScanState>,
    events: broadcast::Sender<ScanEvent>,
}

impl OrchestrationController {
    /// Create a controller. Must be called inside a tokio runtime.
    pub fn new(config: ControllerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            extractor: config.extractor,
            text: config.text,
            image: config.image,
            store: config.store,
            ledger: LedgerQueue::spawn(config.ledger),
            state: Mutex::new(ScanState::Idle),
            events,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state.lock().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ScanEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Scan `resource_id`. Only accepted from `Idle`.
    pub async fn start_scan(&self, resource_id: &str) -> Result<Settled, ControllerError> {
        let scan_id = Uuid::new_v4();
        {
            let mut state = self.state.lock();
            match &*state {
                ScanState::Idle => {}
                ScanState::Scanning { resource_id, .. } => {
                    return Err(ControllerError::ScanInProgress(resource_id.clone()));
                }
                other => return Err(ControllerError::NotIdle(other.name())),
            }
            *state = ScanState::Scanning {
                scan_id,
                resource_id: resource_id.to_string(),
            };
        }

        let mut guard = ScanGuard {
            state: &self.state,
            armed: true,
        };

        self.emit(ScanEvent::Started {
            scan_id,
            resource_id: resource_id.to_string(),
        });

        let settled = self
            .run_scan(resource_id)
            .instrument(info_span!("scan", %scan_id, resource = %resource_id))
            .await;

        guard.armed = false;
        *self.state.lock() = ScanState::Settled(settled.clone());
        self.emit(ScanEvent::Settled(settled.clone()));

        Ok(settled)
    }

    async fn run_scan(&self, resource_id: &str) -> Settled {
        let request = match self.extractor.extract(resource_id).await {
            Ok(request) => request,
            Err(e) => {
                warn!("Content unavailable: {}", e);
                return Settled {
                    resource_id: resource_id.to_string(),
                    settlement: Settlement::Failure(FailureReason::ContentUnavailable(
                        e.to_string(),
                    )),
                    result: None,
                };
            }
        };

        if request.resource_id != resource_id {
            warn!(
                "Extractor returned {} for requested {}",
                request.resource_id, resource_id
            );
            return Settled {
                resource_id: resource_id.to_string(),
                settlement: Settlement::Failure(FailureReason::ContentUnavailable(format!(
                    "extracted {} instead of the requested resource",
                    request.resource_id
                ))),
                result: None,
            };
        }

        let primary_image = request.primary_image();
        let has_image = primary_image.is_some();

        info!(
            "Running signals: {} chars of text, image: {}",
            request.text.chars().count(),
            primary_image.unwrap_or("none")
        );

        let (text_score, image_outcome) = tokio::join!(
            self.text.submit_text(&request.text),
            self.image.submit_image(primary_image)
        );

        let result = BlendedResult::compose(resource_id, text_score, &image_outcome, has_image);

        if let Err(e) = self.store.save(resource_id, &result) {
            error!("Failed to store result: {}", e);
        }
        self.forward_to_ledger(resource_id, &request, &result);

        let settled = Settled::from_result(result);
        info!(
            "Scan settled: {:?}, confidence {}%",
            settled.settlement,
            settled.display_confidence()
        );
        settled
    }

    /// Hand each available signal result to the ledger queue
    fn forward_to_ledger(&self, resource_id: &str, request: &ScanRequest, result: &BlendedResult) {
        if let Some(entry) = LedgerEntry::text(resource_id, &request.text, result.text_score) {
            self.ledger.enqueue(entry);
        }
        if let Some(image_ref) = request.primary_image() {
            if let Some(entry) = LedgerEntry::image(image_ref, result.image_score) {
                self.ledger.enqueue(entry);
            }
        }
    }

    /// Re-open the stored result for `resource_id`, if there is one.
    /// Only accepted from `Idle`; a miss leaves the controller `Idle`.
    pub fn restore(&self, resource_id: &str) -> Result<Option<Settled>, ControllerError> {
        let mut state = self.state.lock();
        if *state != ScanState::Idle {
            return Err(ControllerError::NotIdle(state.name()));
        }

        let stored = match self.store.load(resource_id) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Could not read stored result for {}: {}", resource_id, e);
                None
            }
        };

        let Some(result) = stored else {
            return Ok(None);
        };

        info!("Restoring saved result for {}", resource_id);
        let settled = Settled::from_result(result);
        *state = ScanState::Settled(settled.clone());
        drop(state);

        self.emit(ScanEvent::Restored(settled.clone()));
        Ok(Some(settled))
    }

    /// Forget the settled scan so the next open starts fresh
    pub fn reset(&self) -> Result<String, ControllerError> {
        let mut state = self.state.lock();
        let resource_id = match &*state {
            ScanState::Settled(settled) => settled.resource_id.clone(),
            other => return Err(ControllerError::NotSettled(other.name())),
        };

        if let Err(e) = self.store.clear(&resource_id) {
            error!("Failed to clear stored result for {}: {}", resource_id, e);
        }
        *state = ScanState::Idle;
        drop(state);

        info!("Reset {}", resource_id);
        self.emit(ScanEvent::Reset {
            resource_id: resource_id.clone(),
        });
        Ok(resource_id)
    }

    /// Drop whatever is stored for `resource_id`, readable or not.
    /// Only accepted from `Idle`.
    pub fn discard(&self, resource_id: &str) -> Result<(), ControllerError> {
        let state = self.state.lock();
        if *state != ScanState::Idle {
            return Err(ControllerError::NotIdle(state.name()));
        }

        self.store
            .clear(resource_id)
            .map_err(|e| ControllerError::Store(e.to_string()))?;
        info!("Discarded stored result for {}", resource_id);
        Ok(())
    }

    /// Wait for queued ledger writes; call before the process exits
    pub async fn shutdown(&self) {
        self.ledger.shutdown().await;
    }
}
