//! Mock bridge for testing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::bridge::{Bridge, BridgeFuture};
use crate::{BridgeError, OutputKind};

/// A canned response for [`MockBridge`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    Bytes(Vec<u8>),
    /// Simulate the deadline elapsing.
    Timeout,
    /// Simulate a connection failure.
    Refused,
}

/// A hand-rolled [`Bridge`] for tests.
///
/// Responses are configured per output kind (metadata and mimetype share
/// one, as they do on the real engine). Every call is counted, and an
/// optional delay is honoured against the caller's timeout.
#[derive(Debug, Default)]
pub struct MockBridge {
    responses: Mutex<HashMap<&'static [&'static str], MockResponse>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    calls_by_kind: Mutex<HashMap<OutputKind, usize>>,
}

impl MockBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, kind: OutputKind, response: MockResponse) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(kind.flags(), response);
        self
    }

    pub fn with_bytes(self, kind: OutputKind, bytes: impl Into<Vec<u8>>) -> Self {
        self.with_response(kind, MockResponse::Bytes(bytes.into()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total number of `invoke` calls.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, kind: OutputKind) -> usize {
        self.calls_by_kind
            .lock()
            .unwrap()
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }
}

impl Bridge for MockBridge {
    fn name(&self) -> &str {
        "mock"
    }

    fn invoke<'a>(
        &'a self,
        kind: OutputKind,
        _bytes: &'a [u8],
        timeout: Option<Duration>,
    ) -> BridgeFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_by_kind.lock().unwrap().entry(kind).or_default() += 1;
        let response = self.responses.lock().unwrap().get(kind.flags()).cloned();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                if let Some(limit) = timeout
                    && limit < d
                {
                    tokio::time::sleep(limit).await;
                    return Err(BridgeError::Timeout(limit));
                }
                tokio::time::sleep(d).await;
            }
            match response {
                Some(MockResponse::Bytes(bytes)) => Ok(bytes),
                Some(MockResponse::Timeout) => {
                    Err(BridgeError::Timeout(timeout.unwrap_or_default()))
                }
                Some(MockResponse::Refused) => Err(BridgeError::Connect {
                    port: 0,
                    source: std::io::ErrorKind::ConnectionRefused.into(),
                }),
                None => Ok(Vec::new()),
            }
        })
    }
}
