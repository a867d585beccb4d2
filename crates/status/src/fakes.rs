//! In-memory port implementations for tests.
//!
//! Compiled for this crate's own tests and, through the `test-support`
//! feature, for other crates' tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{HttpRequest, HttpResponse, HttpTransport, LogEntry, LogLevel, LogSink, TransportError};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Scripted [`HttpTransport`] that records every request it receives.
///
/// Responses are queued per exact URL and handed out in FIFO order. A request
/// to a URL with no queued response fails with [`TransportError::Request`].
#[derive(Clone, Default)]
pub struct FakeTransport {
    responses: Arc<Mutex<HashMap<String, VecDeque<HttpResponse>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `response` for the next request to `url`.
    pub fn respond(&self, url: impl Into<String>, response: HttpResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(url.into())
            .or_default()
            .push_back(response);
    }

    /// Get all recorded requests, in the order they were sent.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Get recorded requests sent to `url`.
    pub fn requests_to(&self, url: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == url)
            .collect()
    }

    /// Returns `true` once every queued response has been consumed.
    pub fn is_drained(&self) -> bool {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .all(VecDeque::is_empty)
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&url)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| TransportError::Request {
                url,
                message: "connection refused".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Log sink
// ---------------------------------------------------------------------------

/// [`LogSink`] that keeps every entry in memory.
#[derive(Clone, Default)]
pub struct RecordingSink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Rendered messages of all recorded entries.
    pub fn messages(&self) -> Vec<String> {
        self.entries().iter().map(ToString::to_string).collect()
    }

    /// Returns `true` if any rendered message contains `needle`.
    pub fn logged(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }

    /// Entries at [`LogLevel::Warn`] or above.
    pub fn problems(&self) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level() >= LogLevel::Warn)
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl LogSink for RecordingSink {
    fn record(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }
}
