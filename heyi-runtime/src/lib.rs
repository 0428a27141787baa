//! HEYI Runtime
//!
//! Drives a scan from request to settled result:
//! - `OrchestrationController`: lifecycle state machine, signal fan-out/fan-in,
//!   persistence and event emission
//! - `LedgerQueue`: supervised background delivery of ledger writes

pub mod controller;
pub mod ledger_queue;

pub use controller::*;
pub use ledger_queue::*;
