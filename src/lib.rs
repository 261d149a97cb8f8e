//! chatfabric - a minimal distributed chat fabric
//!
//! A topic-based relay broker plus automated chat agents, built on a
//! message-oriented transport:
//! - Relay broker forwarding published frames to prefix-matched subscribers
//! - Request/reply envelope protocol for the external reply service
//! - Agent loop driving periodic publish activity over the protocol
//!
//! # Quick Start
//!
//! ```rust
//! use chatfabric::protocol::{Envelope, Service};
//! use serde_json::json;
//!
//! // Build a publish request the way the agent does
//! let request = Envelope::publish("Bot1", "geral", "hello", "2024-01-01T12:00:00Z");
//! assert_eq!(request.service, Service::Publish);
//!
//! // Envelopes travel as UTF-8 JSON text
//! let wire = request.to_wire().unwrap();
//! let parsed = Envelope::from_wire(&wire).unwrap();
//! assert_eq!(parsed.data, request.data);
//! ```

pub mod agent;
pub mod broker;
pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod testing;
pub mod transport;

pub use agent::{AgentRunner, AgentState};
pub use broker::RelayBroker;
pub use client::ChatClient;
pub use config::*;
pub use error::{FabricError, FabricResult};
pub use protocol::{Envelope, Service};
pub use transport::{RequestTransport, Subscriber, TransportError};
