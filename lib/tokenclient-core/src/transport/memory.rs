use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ProtocolRequest, ProtocolResponse, Transport, TransportError};
use crate::parameters::Parameters;

/// In-memory transport stub.
///
/// Answers with queued responses (in order), then with the fallback response if
/// one is set. Every request is recorded, so tests can count exchanges and inspect
/// what was sent. Clones share the same queue and record.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    queued: VecDeque<Result<ProtocolResponse, String>>,
    fallback: Option<ProtocolResponse>,
    requests: Vec<ProtocolRequest>,
}

impl InMemoryTransport {
    /// Creates a transport with no response configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport answering every request with `response`.
    pub fn with_response(response: ProtocolResponse) -> Self {
        let transport = Self::new();
        transport.lock().fallback = Some(response);
        transport
    }

    /// Creates a transport answering every request with a `200 OK` token response.
    pub fn with_token(access_token: &str, expires_in: u64) -> Self {
        Self::with_response(ProtocolResponse::ok(
            Parameters::new()
                .with("token_type", "Bearer")
                .with("access_token", access_token)
                .with("expires_in", expires_in.to_string()),
        ))
    }

    /// Queues a response served before the fallback.
    pub fn push_response(&self, response: ProtocolResponse) {
        self.lock().queued.push_back(Ok(response));
    }

    /// Queues a transport failure served before the fallback.
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.lock().queued.push_back(Err(reason.into()));
    }

    /// All requests sent so far.
    pub fn requests(&self) -> Vec<ProtocolRequest> {
        self.lock().requests.clone()
    }

    /// The last request sent.
    pub fn last_request(&self) -> Option<ProtocolRequest> {
        self.lock().requests.last().cloned()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for InMemoryTransport {
    async fn send(&self, request: ProtocolRequest) -> Result<ProtocolResponse, TransportError> {
        let mut inner = self.lock();
        inner.requests.push(request);

        match inner.queued.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(TransportError::Other { reason }),
            None => inner.fallback.clone().ok_or_else(|| TransportError::Other {
                reason: "no response configured".to_string(),
            }),
        }
    }
}
