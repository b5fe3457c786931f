//! Shared test helpers: an in-process transport with scripted responses.

use crate::error::{Error, Result};
use crate::transport::Transport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Clone, Debug)]
enum Scripted {
    Body(String),
    /// Deliver these bytes, then fail the transfer
    Broken(String),
}

/// [`Transport`] answering from a per-URI script
///
/// Unscripted URIs fail with HTTP 404. Transfers can be held open behind a
/// gate so tests can observe slots while they are busy.
pub(crate) struct ScriptedTransport {
    responses: Mutex<HashMap<String, Scripted>>,
    delay: Duration,
    gate: Option<Arc<Semaphore>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            gate: None,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `uri` with `body`
    pub(crate) fn with_body(self, uri: impl Into<String>, body: impl Into<String>) -> Self {
        self.set_body(uri, body);
        self
    }

    /// Deliver `partial` for `uri` and then report a transport error
    pub(crate) fn with_broken(self, uri: impl Into<String>, partial: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(uri.into(), Scripted::Broken(partial.into()));
        self
    }

    /// Make every transfer take at least `delay`
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Hold every transfer until [`release`](Self::release) grants it a permit
    pub(crate) fn held(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Change the answer for `uri` after construction
    pub(crate) fn set_body(&self, uri: impl Into<String>, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(uri.into(), Scripted::Body(body.into()));
    }

    /// Let `n` held transfers proceed
    pub(crate) fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Transfers currently inside `get`
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous transfers observed
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Every URI requested so far, in dispatch order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of times `uri` was requested
    pub(crate) fn calls_for(&self, uri: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == uri).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, uri: &str, body: &mut Vec<u8>) -> Result<()> {
        self.calls.lock().unwrap().push(uri.to_string());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.responses.lock().unwrap().get(uri).cloned();
        self.active.fetch_sub(1, Ordering::SeqCst);

        match scripted {
            Some(Scripted::Body(text)) => {
                body.extend_from_slice(text.as_bytes());
                Ok(())
            }
            Some(Scripted::Broken(partial)) => {
                body.extend_from_slice(partial.as_bytes());
                Err(Error::Other(format!("connection reset while reading {}", uri)))
            }
            None => Err(Error::Http {
                status: 404,
                uri: uri.to_string(),
            }),
        }
    }
}
