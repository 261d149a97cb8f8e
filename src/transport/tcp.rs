//! TCP implementations of the transport roles
//!
//! All three roles speak newline-delimited JSON. The request transport
//! carries envelopes; publisher and subscriber carry pub/sub frames.

use super::frame::{read_frame, write_frame, Frame};
use super::{RequestTransport, Subscriber, TransportError};
use crate::protocol::Envelope;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Lock-step request/reply connection over TCP
///
/// An optional timeout bounds each exchange. The default (no timeout)
/// blocks indefinitely, matching the fabric's historical behavior; when a
/// bound is set, expiry desynchronizes the connection because the late
/// reply would pair with the next request.
pub struct TcpRequestTransport {
    stream: Option<BufReader<TcpStream>>,
    timeout: Option<Duration>,
    desynchronized: bool,
}

impl TcpRequestTransport {
    /// Connect to the reply service
    pub async fn connect(addr: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(addr, "Request connection established");
        Ok(Self {
            stream: Some(BufReader::new(stream)),
            timeout,
            desynchronized: false,
        })
    }

    async fn exchange_inner(
        stream: &mut BufReader<TcpStream>,
        request: &Envelope,
    ) -> Result<Envelope, TransportError> {
        let mut line = request.to_wire()?;
        line.push('\n');
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;

        let mut response_line = String::new();
        let bytes = stream.read_line(&mut response_line).await?;
        if bytes == 0 {
            return Err(TransportError::Closed);
        }
        Ok(Envelope::from_wire(response_line.trim_end())?)
    }
}

#[async_trait::async_trait]
impl RequestTransport for TcpRequestTransport {
    async fn exchange(&mut self, request: &Envelope) -> Result<Envelope, TransportError> {
        if self.desynchronized {
            return Err(TransportError::Desynchronized);
        }
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;

        let result = match self.timeout {
            Some(bound) => match tokio::time::timeout(bound, Self::exchange_inner(stream, request))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout),
            },
            None => Self::exchange_inner(stream, request).await,
        };

        if result.is_err() {
            // The pairing between this request and its reply is now lost.
            self.desynchronized = true;
        }
        result
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                warn!(error = %e, "Error closing request connection");
            }
        }
        Ok(())
    }
}

/// Publish-only connection to the broker's upstream endpoint
///
/// The broker echoes subscription control frames back on this connection
/// as filter hints; `next_control` exposes them for publishers that want
/// to filter at the source.
pub struct TcpPublisher {
    stream: Option<BufReader<TcpStream>>,
}

impl TcpPublisher {
    /// Connect to the broker's upstream endpoint
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(addr, "Publisher connection established");
        Ok(Self {
            stream: Some(BufReader::new(stream)),
        })
    }

    /// Publish one message on a topic
    pub async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        write_frame(
            stream,
            &Frame::Publish {
                topic: topic.to_string(),
                payload: payload.to_string(),
            },
        )
        .await
    }

    /// Next subscription filter hint from the broker; `Ok(None)` when the
    /// connection ends
    pub async fn next_control(&mut self) -> Result<Option<Frame>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        read_frame(stream).await
    }

    /// Close the connection; idempotent
    pub async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                warn!(error = %e, "Error closing publisher connection");
            }
        }
        Ok(())
    }
}

/// Subscribe-only connection to the broker's downstream endpoint
pub struct TcpSubscriber {
    stream: Option<BufReader<TcpStream>>,
}

impl TcpSubscriber {
    /// Connect to the broker's downstream endpoint
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(addr, "Subscriber connection established");
        Ok(Self {
            stream: Some(BufReader::new(stream)),
        })
    }

    async fn send_control(&mut self, frame: Frame) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        write_frame(stream, &frame).await
    }
}

#[async_trait::async_trait]
impl Subscriber for TcpSubscriber {
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.send_control(Frame::Subscribe {
            topic: topic.to_string(),
        })
        .await
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.send_control(Frame::Unsubscribe {
            topic: topic.to_string(),
        })
        .await
    }

    async fn next_message(&mut self) -> Result<Option<(String, String)>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        loop {
            match read_frame(stream).await? {
                Some(Frame::Publish { topic, payload }) => return Ok(Some((topic, payload))),
                // The broker only sends publishes downstream; tolerate
                // anything else rather than desynchronize the feed.
                Some(other) => debug!(?other, "Ignoring non-publish frame on subscriber feed"),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                warn!(error = %e, "Error closing subscriber connection");
            }
        }
        Ok(())
    }
}
