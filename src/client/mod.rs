//! Client protocol handler for the chat fabric
//!
//! Implements every request type the client side issues against the
//! external reply service, each as one synchronous request/reply exchange,
//! plus the subscription for direct-message delivery. Generic over the
//! transport traits so tests can inject mocks.
//!
//! Transport failures surface to callers as absence (a `false` publish, an
//! empty channel list), never as panics; only login and the final
//! no-channels condition are fatal, because the agent cannot run without
//! them.

use crate::protocol::{direct_topic, Envelope, STATUS_OK, STATUS_SUCESSO};
use crate::transport::{RequestTransport, Subscriber, TransportError};
use thiserror::Error;
use tracing::{error, info, warn};

/// Channels created when discovery returns nothing
pub const DEFAULT_CHANNELS: [&str; 4] = ["geral", "tech", "random", "bot-chat"];

/// Client protocol errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Login rejected for user {user}")]
    LoginRejected { user: String },

    #[error("No channels available")]
    NoChannels,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Protocol client owning one request connection and one subscription feed
pub struct ChatClient<R, S> {
    requests: R,
    subscriber: S,
    username: String,
    channels: Vec<String>,
    published: u64,
    failed: u64,
}

impl<R, S> ChatClient<R, S>
where
    R: RequestTransport,
    S: Subscriber,
{
    /// Create a client around already-connected transports
    pub fn new(requests: R, subscriber: S, username: String) -> Self {
        Self {
            requests,
            subscriber,
            username,
            channels: Vec::new(),
            published: 0,
            failed: 0,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Channel names known to this client; loaded once at startup
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Publishes acknowledged with `"OK"` so far
    pub fn published_count(&self) -> u64 {
        self.published
    }

    /// Publishes that failed or were not acknowledged
    pub fn failed_count(&self) -> u64 {
        self.failed
    }

    /// Perform the login handshake. Any non-success response or transport
    /// failure aborts startup.
    pub async fn login(&mut self) -> Result<(), ClientError> {
        let request = Envelope::login(&self.username, &now_timestamp());
        match self.requests.exchange(&request).await {
            Ok(response) if response.has_status(STATUS_SUCESSO) => {
                info!(user = %self.username, "Login succeeded");
                Ok(())
            }
            Ok(response) => {
                error!(user = %self.username, ?response, "Login rejected");
                Err(ClientError::LoginRejected {
                    user: self.username.clone(),
                })
            }
            Err(e) => {
                error!(user = %self.username, error = %e, "Login request failed");
                Err(ClientError::Transport(e))
            }
        }
    }

    /// Discover channels, falling back to creating the default set when
    /// discovery yields nothing. Fatal only if the set stays empty.
    pub async fn load_channels(&mut self) -> Result<(), ClientError> {
        let request = Envelope::channels(&now_timestamp());
        let names = match self.requests.exchange(&request).await {
            Ok(response) => response.channel_names().unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Channel discovery request failed");
                Vec::new()
            }
        };

        if !names.is_empty() {
            info!(channels = ?names, "Channels discovered");
            self.channels = names;
            return Ok(());
        }

        warn!("No channel available, creating default channels");
        self.create_default_channels().await;
        if self.channels.is_empty() {
            return Err(ClientError::NoChannels);
        }
        Ok(())
    }

    /// Issue one `channel` creation request per default name. Partial
    /// success is fine; failed names are simply omitted from the set.
    pub async fn create_default_channels(&mut self) {
        for name in DEFAULT_CHANNELS {
            let request = Envelope::create_channel(name, &now_timestamp());
            match self.requests.exchange(&request).await {
                Ok(response) if response.has_status(STATUS_SUCESSO) => {
                    info!(channel = name, "Channel created");
                    self.channels.push(name.to_string());
                }
                Ok(response) => {
                    warn!(channel = name, ?response, "Channel creation rejected");
                }
                Err(e) => {
                    warn!(channel = name, error = %e, "Channel creation request failed");
                }
            }
        }
    }

    /// Publish one message to a channel. Returns whether the reply service
    /// acknowledged with `"OK"`; failures are counted, never retried here.
    ///
    /// A desynchronized or timed-out request connection is surfaced as an
    /// error so the caller's loop boundary can back off.
    pub async fn publish(&mut self, channel: &str, message: &str) -> Result<bool, ClientError> {
        let request = Envelope::publish(&self.username, channel, message, &now_timestamp());
        match self.requests.exchange(&request).await {
            Ok(response) if response.has_status(STATUS_OK) => {
                self.published += 1;
                info!(
                    channel,
                    message,
                    count = self.published,
                    "Message published"
                );
                Ok(true)
            }
            Ok(response) => {
                self.failed += 1;
                warn!(channel, ?response, "Publish not acknowledged");
                Ok(false)
            }
            Err(e @ (TransportError::Desynchronized | TransportError::Timeout)) => {
                self.failed += 1;
                Err(ClientError::Transport(e))
            }
            Err(e) => {
                self.failed += 1;
                warn!(channel, error = %e, "Publish request failed");
                Ok(false)
            }
        }
    }

    /// Subscribe to this user's direct-message topic. Non-fatal: on
    /// failure, direct-message delivery degrades silently.
    pub async fn subscribe_direct(&mut self) {
        let topic = direct_topic(&self.username);
        match self.subscriber.subscribe(&topic).await {
            Ok(()) => info!(topic, "Subscribed for direct messages"),
            Err(e) => warn!(topic, error = %e, "Direct-message subscription failed"),
        }
    }

    /// Next message from the subscription feed, as (topic, payload)
    pub async fn next_direct_message(
        &mut self,
    ) -> Result<Option<(String, String)>, ClientError> {
        Ok(self.subscriber.next_message().await?)
    }

    /// Release both connections. Idempotent; close errors are logged only.
    pub async fn close(&mut self) {
        if let Err(e) = self.requests.close().await {
            warn!(error = %e, "Error closing request connection");
        }
        if let Err(e) = self.subscriber.close().await {
            warn!(error = %e, "Error closing subscriber connection");
        }
    }
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
