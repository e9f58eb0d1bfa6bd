//! In-process doubles for the remote endpoints, shared by unit tests.

use crate::transport::{JsonTransport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Responder = dyn Fn(&[(&str, String)]) -> Result<Value, TransportError> + Send + Sync;

/// A [`JsonTransport`] answering every request from a closure, recording the calls.
pub(crate) struct FakeTransport {
    respond: Box<Responder>,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<(String, String)>>>,
}

impl FakeTransport {
    pub(crate) fn new<F>(respond: F) -> Self
    where
        F: Fn(&[(&str, String)]) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `payload`.
    pub(crate) fn constant(payload: Value) -> Self {
        Self::new(move |_| Ok(payload.clone()))
    }

    /// Always fails as if the endpoint were down.
    pub(crate) fn offline() -> Self {
        Self::new(|_| Err(TransportError::Unavailable("offline".to_string())))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Query parameters of every request so far, in arrival order.
    pub(crate) fn requests(&self) -> Vec<Vec<(String, String)>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl JsonTransport for FakeTransport {
    async fn get_json(&self, _url: &str, params: &[(&str, String)]) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        );
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.respond)(params)
    }
}
