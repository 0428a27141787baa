//! HEYI Network Layer
//!
//! HTTP plumbing shared by the signal clients:
//! - Endpoint configuration and client construction
//! - Page content extraction (text + ranked images)
//! - Flagged-domain lookup

pub mod client;
pub mod extractor;
pub mod flags;

pub use client::*;
pub use extractor::*;
pub use flags::*;
