//! In-process transport for tests and offline demos.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::{Endpoint, Transport};
use crate::error::RemoteError;
use crate::sync::lock;

type Reply = Result<serde_json::Value, RemoteError>;

/// A transport that replays queued responses and records every request.
///
/// Requests are recorded before the optional latency elapses, so a call
/// counts as issued as soon as it starts.
#[derive(Default)]
pub struct MockTransport {
    queued: Mutex<HashMap<Endpoint, VecDeque<Reply>>>,
    fallback: Mutex<HashMap<Endpoint, Reply>>,
    requests: Mutex<HashMap<Endpoint, Vec<serde_json::Value>>>,
    latency: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Queue a response body for the next call to `endpoint`.
    pub fn respond(&self, endpoint: Endpoint, body: serde_json::Value) {
        self.push(endpoint, Ok(body));
    }

    /// Queue a transport-level failure for the next call to `endpoint`.
    pub fn fail(&self, endpoint: Endpoint, message: &str) {
        self.push(
            endpoint,
            Err(RemoteError::Transport {
                endpoint: endpoint.to_string(),
                message: message.to_string(),
            }),
        );
    }

    /// Response returned whenever the queue for `endpoint` is empty.
    pub fn respond_always(&self, endpoint: Endpoint, body: serde_json::Value) {
        lock(&self.fallback).insert(endpoint, Ok(body));
    }

    /// Build a success envelope around `data`.
    pub fn success(data: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "status": "success", "data": data })
    }

    /// Build an error envelope carrying `message`.
    pub fn error(message: &str) -> serde_json::Value {
        serde_json::json!({ "status": "error", "message": message })
    }

    /// Number of requests issued to `endpoint`.
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        lock(&self.requests).get(&endpoint).map_or(0, Vec::len)
    }

    /// Total number of requests across all endpoints.
    pub fn total_calls(&self) -> usize {
        lock(&self.requests).values().map(Vec::len).sum()
    }

    /// Request bodies sent to `endpoint`, in issue order.
    pub fn requests(&self, endpoint: Endpoint) -> Vec<serde_json::Value> {
        lock(&self.requests)
            .get(&endpoint)
            .cloned()
            .unwrap_or_default()
    }

    fn push(&self, endpoint: Endpoint, reply: Reply) {
        lock(&self.queued).entry(endpoint).or_default().push_back(reply);
    }

    fn next_reply(&self, endpoint: Endpoint) -> Reply {
        if let Some(reply) = lock(&self.queued)
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        lock(&self.fallback)
            .get(&endpoint)
            .cloned()
            .unwrap_or_else(|| {
                Err(RemoteError::Transport {
                    endpoint: endpoint.to_string(),
                    message: "no mock response queued".into(),
                })
            })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, endpoint: Endpoint, body: serde_json::Value) -> Reply {
        lock(&self.requests).entry(endpoint).or_default().push(body);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.next_reply(endpoint)
    }
}
