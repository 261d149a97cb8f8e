//! Observability
//!
//! Structured logging for the broker and agent binaries.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};
