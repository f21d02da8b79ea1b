//! Kenburns Common Utilities
//!
//! Shared infrastructure for all Kenburns crates:
//! - Error taxonomy and result aliases
//! - Deterministic frame clock used by export
//! - Cooperative cancellation token
//! - Tracing/logging initialization
//! - Configuration loading

pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use cancel::*;
pub use clock::*;
pub use config::*;
pub use error::*;
