//! Automated chat agent
//!
//! Drives periodic publish activity through the client protocol handler:
//! login, channel discovery, direct-message subscription, then a steady
//! publish loop until asked to stop.

pub mod identity;
pub mod runner;

pub use identity::generate_username;
pub use runner::{AgentRunner, AgentState, MESSAGE_POOL};
