//! Mock implementations of the transport traits
//!
//! Both mocks hand out `Arc` handles to their recorded state so tests can
//! keep inspecting after moving the mock into a client or runner.

use crate::protocol::Envelope;
use crate::transport::{RequestTransport, Subscriber, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Scripted request transport: answers exchanges from a queue
#[derive(Debug, Default)]
pub struct MockRequestTransport {
    sent: Arc<Mutex<Vec<Envelope>>>,
    responses: Arc<Mutex<VecDeque<Result<Envelope, TransportError>>>>,
    closed: Arc<Mutex<bool>>,
}

impl MockRequestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response for the next exchange
    pub async fn enqueue_response(&self, response: Envelope) {
        self.responses.lock().await.push_back(Ok(response));
    }

    /// Queue a transport failure for the next exchange
    pub async fn enqueue_failure(&self, error: TransportError) {
        self.responses.lock().await.push_back(Err(error));
    }

    /// Handle to every request sent through this transport
    pub fn sent_handle(&self) -> Arc<Mutex<Vec<Envelope>>> {
        self.sent.clone()
    }

    /// Handle to the closed flag
    pub fn closed_handle(&self) -> Arc<Mutex<bool>> {
        self.closed.clone()
    }
}

#[async_trait]
impl RequestTransport for MockRequestTransport {
    async fn exchange(&mut self, request: &Envelope) -> Result<Envelope, TransportError> {
        self.sent.lock().await.push(request.clone());
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or(Err(TransportError::Closed))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        *self.closed.lock().await = true;
        Ok(())
    }
}

/// Scripted subscriber: records filters, serves queued messages
#[derive(Debug, Default)]
pub struct MockSubscriber {
    subscriptions: Arc<Mutex<Vec<String>>>,
    queued: Arc<Mutex<VecDeque<(String, String)>>>,
    closed: Arc<Mutex<bool>>,
    fail_subscribe: bool,
}

impl MockSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// A subscriber whose subscribe calls always fail
    pub fn failing() -> Self {
        Self {
            fail_subscribe: true,
            ..Default::default()
        }
    }

    /// Queue a message for `next_message`
    pub async fn enqueue_message(&self, topic: &str, payload: &str) {
        self.queued
            .lock()
            .await
            .push_back((topic.to_string(), payload.to_string()));
    }

    /// Handle to the registered subscription filters
    pub fn subscriptions_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.subscriptions.clone()
    }

    /// Handle to the closed flag
    pub fn closed_handle(&self) -> Arc<Mutex<bool>> {
        self.closed.clone()
    }
}

#[async_trait]
impl Subscriber for MockSubscriber {
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if self.fail_subscribe {
            return Err(TransportError::Closed);
        }
        self.subscriptions.lock().await.push(topic.to_string());
        Ok(())
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.subscriptions.lock().await.retain(|t| t != topic);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<(String, String)>, TransportError> {
        Ok(self.queued.lock().await.pop_front())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        *self.closed.lock().await = true;
        Ok(())
    }
}
