//! Relay broker forwarding published frames to interested subscribers
//!
//! The broker is content-agnostic: it moves frames from the upstream
//! (publisher-facing) endpoint to the downstream (subscriber-facing)
//! endpoint, filtering by opaque topic byte-prefix, and echoes
//! subscription control frames upstream so publishers can filter at the
//! source. It never inspects, transforms, or persists payloads.
//!
//! Each subscriber gets a bounded queue; when a slow subscriber's queue
//! fills, frames addressed to it are dropped while every other subscriber
//! keeps receiving (isolation invariant, best-effort at-most-once).

use crate::config::EndpointsSection;
use crate::protocol::topic_matches;
use crate::transport::frame::{read_frame, write_frame, Frame};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tracing::{debug, info, warn};

/// Frames buffered per subscriber before overflow drops begin
const SUBSCRIBER_QUEUE_DEPTH: usize = 64;

/// Control-frame fan-in capacity toward publishers
const CONTROL_CHANNEL_DEPTH: usize = 64;

/// Relay broker errors
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Failed to bind {role} endpoint {addr}: {source}")]
    Bind {
        role: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One connected subscriber, as seen by the fan-out path
#[derive(Debug)]
struct SubscriberHandle {
    tx: mpsc::Sender<Frame>,
    filters: Arc<Mutex<HashSet<String>>>,
}

/// State shared by all connection tasks
#[derive(Debug)]
struct BrokerState {
    subscribers: Mutex<HashMap<u64, SubscriberHandle>>,
    next_subscriber_id: AtomicU64,
    control_tx: broadcast::Sender<Frame>,
}

impl BrokerState {
    fn new() -> Self {
        let (control_tx, _) = broadcast::channel(CONTROL_CHANNEL_DEPTH);
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_subscriber_id: AtomicU64::new(0),
            control_tx,
        }
    }

    /// Forward one published frame to every subscriber with a matching filter
    async fn fan_out(&self, topic: &str, payload: &str) {
        let subscribers = self.subscribers.lock().await;
        for (id, handle) in subscribers.iter() {
            let matched = {
                let filters = handle.filters.lock().await;
                filters.iter().any(|filter| topic_matches(filter, topic))
            };
            if !matched {
                continue;
            }
            let frame = Frame::Publish {
                topic: topic.to_string(),
                payload: payload.to_string(),
            };
            if handle.tx.try_send(frame).is_err() {
                // Queue full or writer gone: drop for this subscriber only.
                debug!(subscriber = id, topic, "Subscriber queue full, frame dropped");
            }
        }
    }
}

/// The relay broker process core
#[derive(Debug)]
pub struct RelayBroker {
    upstream: TcpListener,
    downstream: TcpListener,
    state: Arc<BrokerState>,
    shutdown: watch::Receiver<bool>,
}

impl RelayBroker {
    /// Bind both endpoints. Binding failure is fatal to the process.
    pub async fn bind(
        endpoints: &EndpointsSection,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, BrokerError> {
        let upstream = TcpListener::bind(&endpoints.upstream)
            .await
            .map_err(|source| BrokerError::Bind {
                role: "upstream",
                addr: endpoints.upstream.clone(),
                source,
            })?;
        info!(addr = %endpoints.upstream, "Upstream endpoint listening for publishers");

        let downstream = TcpListener::bind(&endpoints.downstream)
            .await
            .map_err(|source| BrokerError::Bind {
                role: "downstream",
                addr: endpoints.downstream.clone(),
                source,
            })?;
        info!(addr = %endpoints.downstream, "Downstream endpoint listening for subscribers");

        Ok(Self {
            upstream,
            downstream,
            state: Arc::new(BrokerState::new()),
            shutdown,
        })
    }

    /// Actual upstream address, useful when bound to port 0
    pub fn upstream_addr(&self) -> Result<SocketAddr, BrokerError> {
        Ok(self.upstream.local_addr()?)
    }

    /// Actual downstream address, useful when bound to port 0
    pub fn downstream_addr(&self) -> Result<SocketAddr, BrokerError> {
        Ok(self.downstream.local_addr()?)
    }

    /// Run the relay loop until the shutdown channel fires
    pub async fn run(mut self) -> Result<(), BrokerError> {
        info!("Relay broker running");
        loop {
            tokio::select! {
                accepted = self.upstream.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!(%addr, "Publisher connected");
                        tokio::spawn(serve_publisher(
                            stream,
                            addr,
                            self.state.clone(),
                            self.shutdown.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "Upstream accept failed"),
                },
                accepted = self.downstream.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!(%addr, "Subscriber connected");
                        tokio::spawn(serve_subscriber(
                            stream,
                            addr,
                            self.state.clone(),
                            self.shutdown.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "Downstream accept failed"),
                },
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        // Stop accepting, then drop every subscriber queue so writer tasks
        // drain out. In-flight frames are not guaranteed delivery.
        drop(self.upstream);
        drop(self.downstream);
        self.state.subscribers.lock().await.clear();
        info!("Upstream endpoint closed");
        info!("Downstream endpoint closed");
        info!("Relay broker stopped");
        Ok(())
    }
}

/// Serve one publisher connection: relay its published frames downstream
/// and echo subscription filter hints back to it.
async fn serve_publisher(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<BrokerState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let control_rx = state.control_tx.subscribe();
    let (read_half, write_half) = stream.into_split();
    let hint_writer = tokio::spawn(forward_filter_hints(control_rx, write_half, addr));
    let mut reader = BufReader::new(read_half);

    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok(Some(Frame::Publish { topic, payload })) => {
                    state.fan_out(&topic, &payload).await;
                }
                Ok(Some(other)) => {
                    debug!(%addr, ?other, "Ignoring control frame from publisher");
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(%addr, error = %e, "Publisher connection error");
                    break;
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    hint_writer.abort();
    debug!(%addr, "Publisher disconnected");
}

/// Echo subscription control frames to one publisher as filter hints.
/// Hints are an optimization: lagging behind or failing to write only
/// affects this publisher's ability to filter at the source.
async fn forward_filter_hints(
    mut control_rx: broadcast::Receiver<Frame>,
    mut write_half: OwnedWriteHalf,
    addr: SocketAddr,
) {
    loop {
        match control_rx.recv().await {
            Ok(frame) => {
                if write_frame(&mut write_half, &frame).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(%addr, skipped, "Publisher missed filter hints");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Serve one subscriber connection: track its filters, propagate them
/// upstream, and stream matching publishes to it.
async fn serve_subscriber(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<BrokerState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let id = state.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
    let filters = Arc::new(Mutex::new(HashSet::new()));
    state.subscribers.lock().await.insert(
        id,
        SubscriberHandle {
            tx,
            filters: filters.clone(),
        },
    );

    let writer = tokio::spawn(drain_subscriber_queue(rx, write_half));

    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok(Some(Frame::Subscribe { topic })) => {
                    debug!(subscriber = id, topic, "Subscription registered");
                    filters.lock().await.insert(topic.clone());
                    let _ = state.control_tx.send(Frame::Subscribe { topic });
                }
                Ok(Some(Frame::Unsubscribe { topic })) => {
                    debug!(subscriber = id, topic, "Subscription removed");
                    filters.lock().await.remove(&topic);
                    let _ = state.control_tx.send(Frame::Unsubscribe { topic });
                }
                Ok(Some(Frame::Publish { .. })) => {
                    debug!(subscriber = id, "Ignoring publish frame on downstream side");
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(subscriber = id, %addr, error = %e, "Subscriber connection error");
                    break;
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    state.subscribers.lock().await.remove(&id);
    writer.abort();
    debug!(subscriber = id, %addr, "Subscriber disconnected");
}

/// Write queued frames to one subscriber until its queue closes
async fn drain_subscriber_queue(mut rx: mpsc::Receiver<Frame>, mut write_half: OwnedWriteHalf) {
    while let Some(frame) = rx.recv().await {
        if write_frame(&mut write_half, &frame).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> BrokerState {
        BrokerState::new()
    }

    #[tokio::test]
    async fn test_fan_out_respects_filters() {
        let state = test_state();
        let (tx, mut rx) = mpsc::channel(8);
        let filters = Arc::new(Mutex::new(HashSet::from(["geral".to_string()])));
        state
            .subscribers
            .lock()
            .await
            .insert(0, SubscriberHandle { tx, filters });

        state.fan_out("geral", "hello").await;
        state.fan_out("tech", "other").await;

        let delivered = rx.try_recv().unwrap();
        assert_eq!(
            delivered,
            Frame::Publish {
                topic: "geral".to_string(),
                payload: "hello".to_string(),
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fan_out_prefix_matches() {
        let state = test_state();
        let (tx, mut rx) = mpsc::channel(8);
        let filters = Arc::new(Mutex::new(HashSet::from(["user_".to_string()])));
        state
            .subscribers
            .lock()
            .await
            .insert(0, SubscriberHandle { tx, filters });

        state.fan_out("user_Bot1", "dm").await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_fan_out_overflow_drops_for_slow_subscriber_only() {
        let state = test_state();

        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        let filters = Arc::new(Mutex::new(HashSet::from(["geral".to_string()])));
        state.subscribers.lock().await.insert(
            0,
            SubscriberHandle {
                tx: slow_tx,
                filters: filters.clone(),
            },
        );
        state.subscribers.lock().await.insert(
            1,
            SubscriberHandle {
                tx: fast_tx,
                filters,
            },
        );

        for i in 0..4 {
            state.fan_out("geral", &format!("msg-{i}")).await;
        }

        // The fast subscriber got everything; the slow one only what fit.
        let mut fast_count = 0;
        while fast_rx.try_recv().is_ok() {
            fast_count += 1;
        }
        let mut slow_count = 0;
        while slow_rx.try_recv().is_ok() {
            slow_count += 1;
        }
        assert_eq!(fast_count, 4);
        assert_eq!(slow_count, 1);
    }

    #[tokio::test]
    async fn test_bind_failure_reports_role_and_addr() {
        let endpoints = EndpointsSection {
            upstream: "256.0.0.1:1".to_string(),
            ..Default::default()
        };
        let (_tx, rx) = watch::channel(false);
        let result = RelayBroker::bind(&endpoints, rx).await;
        match result {
            Err(BrokerError::Bind { role, addr, .. }) => {
                assert_eq!(role, "upstream");
                assert_eq!(addr, "256.0.0.1:1");
            }
            other => panic!("Expected bind error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal() {
        let endpoints = EndpointsSection {
            upstream: "127.0.0.1:0".to_string(),
            downstream: "127.0.0.1:0".to_string(),
            ..Default::default()
        };
        let (_tx, rx) = watch::channel(false);
        let broker = RelayBroker::bind(&endpoints, rx).await.unwrap();

        // Rebinding the exact upstream port must fail.
        let taken = broker.upstream_addr().unwrap();
        let conflicting = EndpointsSection {
            upstream: taken.to_string(),
            downstream: "127.0.0.1:0".to_string(),
            ..Default::default()
        };
        let (_tx2, rx2) = watch::channel(false);
        assert!(matches!(
            RelayBroker::bind(&conflicting, rx2).await,
            Err(BrokerError::Bind { role: "upstream", .. })
        ));
    }
}
