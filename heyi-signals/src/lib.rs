//! HEYI Signals
//!
//! The two independent classification signals and the ledger they report to:
//! - **Text**: two-phase job submission + server-sent result stream
//! - **Image**: single request/response verification call
//! - **Ledger**: best-effort archival of individual signal results

pub mod traits;
pub mod wire;
pub mod text;
pub mod image;
pub mod ledger;

pub use traits::*;
pub use wire::*;
pub use text::*;
pub use image::*;
pub use ledger::*;
