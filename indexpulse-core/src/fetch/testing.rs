//! Test doubles for the transport and sleeper seams.
//!
//! Public so downstream crates can drive sources without a network.

use super::retry::Sleeper;
use super::transport::{HttpReply, HttpRequest, HttpTransport, TransportFailure};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Transport that replays a fixed script of replies and records requests.
///
/// Once the script runs out every further request fails.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpReply, TransportFailure>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Ok(HttpReply {
            status,
            body: body.into(),
        }))
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Err(TransportFailure(message.into())))
    }

    fn push(self, entry: Result<HttpReply, TransportFailure>) -> Self {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(entry);
        }
        self
    }

    /// Shared handle to the requests seen so far.
    pub fn requests(&self) -> Arc<Mutex<Vec<HttpRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpReply, TransportFailure> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| Err(TransportFailure("script exhausted".into())))
    }
}

/// Sleeper that records requested delays instead of blocking.
///
/// Clones share the same record.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn total(&self) -> Duration {
        self.delays().into_iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut d) = self.delays.lock() {
            d.push(duration);
        }
    }
}
