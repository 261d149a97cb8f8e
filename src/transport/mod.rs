//! Transport layer for fabric communication
//!
//! This module provides the transport abstraction and its TCP
//! implementation. Two connection roles exist on the client side: a
//! lock-step request/reply exchange with the reply service, and a
//! subscribe-only message feed from the relay broker. The traits exist to
//! enable dependency injection and testing.

use crate::protocol::Envelope;
use thiserror::Error;

pub mod frame;
pub mod tcp;

/// Transport-level failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Request timed out waiting for the reply")]
    Timeout,

    #[error("Connection desynchronized, reconnect required")]
    Desynchronized,

    #[error("Connection closed")]
    Closed,
}

/// Lock-step request/reply connection to the reply service
///
/// Exactly one send is followed by exactly one receive; `exchange` taking
/// `&mut self` enforces the single-exchange-in-flight invariant at compile
/// time. A failed exchange leaves the connection desynchronized: the reply
/// that never arrived (or arrived late) would pair with the wrong request,
/// so all later exchanges fail until a reconnect.
#[async_trait::async_trait]
pub trait RequestTransport: Send {
    /// Send one request and wait for its response
    async fn exchange(&mut self, request: &Envelope) -> Result<Envelope, TransportError>;

    /// Close the connection; must be idempotent
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Subscribe-only connection to the broker's downstream endpoint
#[async_trait::async_trait]
pub trait Subscriber: Send {
    /// Register a topic-prefix filter with the broker
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Remove a previously registered filter
    async fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Next published message matching a subscription, as (topic, payload).
    /// `Ok(None)` means the feed ended.
    async fn next_message(&mut self) -> Result<Option<(String, String)>, TransportError>;

    /// Close the connection; must be idempotent
    async fn close(&mut self) -> Result<(), TransportError>;
}
