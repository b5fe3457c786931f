//! Bounded-concurrency fetch multiplexer.
//!
//! Callers [`enqueue`](Multiplexer::enqueue) URIs without blocking; each
//! [`pump`](Multiplexer::pump) moves finished transfers into the
//! [`FetchCache`] and hands queued URIs to idle slots. At most
//! `max_parallel` transfers are ever in flight, however many URIs are queued.
//!
//! The multiplexer is owned and driven by a single task. Transfers themselves
//! run as spawned tokio tasks, so network I/O keeps making progress whenever
//! the owner yields (typically while sleeping between pumps).

use crate::error::Error;
use crate::transport::Transport;
use crate::types::FetchStats;
use futures::FutureExt;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

mod blocking;
mod cache;

pub use cache::FetchCache;

/// Result of one transfer: whatever bytes arrived, and the error that ended it early
struct TransferOutcome {
    body: Vec<u8>,
    error: Option<Error>,
}

/// One unit of fetch capacity
///
/// The slot keeps its transport handle for its whole life and reuses it for
/// every URI it serves. A slot is busy exactly while it owns a transfer.
pub struct FetchSlot<T: Transport> {
    transport: Arc<T>,
    uri: String,
    transfer: Option<JoinHandle<TransferOutcome>>,
}

impl<T: Transport> FetchSlot<T> {
    fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            uri: String::new(),
            transfer: None,
        }
    }

    /// Whether a transfer is bound to this slot
    pub fn is_busy(&self) -> bool {
        self.transfer.is_some()
    }

    /// URI of the current (or most recent) transfer
    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn start(&mut self, uri: String) {
        debug_assert!(!self.is_busy(), "slot rebound while busy");

        let transport = Arc::clone(&self.transport);
        let target = uri.clone();
        self.transfer = Some(tokio::spawn(async move {
            let mut body = Vec::new();
            let error = transport.get(&target, &mut body).await.err();
            TransferOutcome { body, error }
        }));
        self.uri = uri;
    }

    /// Take the outcome if the transfer has ended; the slot becomes idle
    fn finish(&mut self) -> Option<TransferOutcome> {
        let handle = self.transfer.as_mut()?;
        if !handle.is_finished() {
            return None;
        }

        // A finished handle can still report Pending when the task's
        // cooperative budget is spent; try again on the next pump.
        let joined = handle.now_or_never()?;
        self.transfer = None;

        Some(match joined {
            Ok(outcome) => outcome,
            Err(e) => TransferOutcome {
                body: Vec::new(),
                error: Some(Error::Other(format!("transfer task failed: {}", e))),
            },
        })
    }

    /// Abort the bound transfer, if any; the slot becomes idle
    fn cancel(&mut self) -> bool {
        match self.transfer.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl<T: Transport> Drop for FetchSlot<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Fixed pool of fetch slots fed from a FIFO backlog
pub struct Multiplexer<T: Transport> {
    slots: Vec<FetchSlot<T>>,
    pending: VecDeque<String>,
    cache: FetchCache,
    stats: FetchStats,
}

impl<T: Transport> Multiplexer<T> {
    /// Create a multiplexer with `max_parallel` slots sharing one transport
    ///
    /// `max_parallel` is clamped to at least one slot.
    pub fn new(transport: T, max_parallel: usize) -> Self {
        Self::with_shared(Arc::new(transport), max_parallel)
    }

    /// Create a multiplexer from an already shared transport
    pub fn with_shared(transport: Arc<T>, max_parallel: usize) -> Self {
        let slots = (0..max_parallel.max(1))
            .map(|_| FetchSlot::new(Arc::clone(&transport)))
            .collect();

        Self {
            slots,
            pending: VecDeque::new(),
            cache: FetchCache::new(),
            stats: FetchStats::default(),
        }
    }

    /// Queue a fetch; never blocks
    ///
    /// Duplicates are allowed: each one becomes its own transfer, and the
    /// later completion replaces the earlier unread body.
    pub fn enqueue(&mut self, uri: impl Into<String>) {
        self.pending.push_back(uri.into());
    }

    /// Advance the multiplexer one non-blocking step
    ///
    /// Collects finished transfers into the cache, then fills idle slots from
    /// the front of the backlog.
    pub fn pump(&mut self) {
        self.collect_completed();
        self.dispatch_pending();
    }

    /// Move every finished transfer's body into the cache and free its slot
    ///
    /// A failed transfer is still a completion: its partial body (possibly
    /// empty) lands in the cache and nothing is re-queued.
    pub fn collect_completed(&mut self) -> usize {
        let mut completed = 0;

        for slot in self.slots.iter_mut() {
            let Some(outcome) = slot.finish() else {
                continue;
            };
            completed += 1;

            if let Some(e) = &outcome.error {
                warn!(uri = %slot.uri, error = %e, bytes = outcome.body.len(), "Transfer failed");
            } else {
                trace!(uri = %slot.uri, bytes = outcome.body.len(), "Transfer complete");
            }

            self.stats.bytes += outcome.body.len() as u64;
            let body = match String::from_utf8(outcome.body) {
                Ok(text) => text,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            };
            self.cache.insert(slot.uri.clone(), body);
        }

        completed
    }

    /// Bind queued URIs to idle slots, first idle slot first, until either runs out
    pub fn dispatch_pending(&mut self) -> usize {
        let mut dispatched = 0;

        while !self.pending.is_empty() {
            let Some(slot) = self.slots.iter_mut().find(|slot| !slot.is_busy()) else {
                break;
            };
            let Some(uri) = self.pending.pop_front() else {
                break;
            };

            trace!(uri = %uri, "Dispatching transfer");
            slot.start(uri);
            self.stats.requests += 1;
            dispatched += 1;
        }

        dispatched
    }

    /// Remove and return the finished body for `uri`, if any
    pub fn take(&mut self, uri: &str) -> Option<String> {
        self.cache.take(uri)
    }

    /// Whether `uri` is queued or bound to a busy slot
    pub fn is_outstanding(&self, uri: &str) -> bool {
        self.pending.iter().any(|queued| queued == uri)
            || self
                .slots
                .iter()
                .any(|slot| slot.is_busy() && slot.uri == uri)
    }

    /// Forget everything requested so far that nobody claimed
    ///
    /// Drops finished bodies, queued URIs and transfers still in flight, so
    /// a response requested in one round can never be read in a later one.
    /// Returns how many bodies, queued URIs and transfers were dropped.
    pub fn discard_unclaimed(&mut self) -> usize {
        let bodies = self.cache.clear();
        let queued = self.pending.len();
        self.pending.clear();
        let aborted = self
            .slots
            .iter_mut()
            .map(|slot| slot.cancel())
            .filter(|&aborted| aborted)
            .count();

        let dropped = bodies + queued + aborted;
        if dropped > 0 {
            debug!(bodies, queued, aborted, "Discarded unclaimed fetches");
        }
        dropped
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slots currently bound to a transfer
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_busy()).count()
    }

    /// URIs waiting for a slot
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Finished bodies waiting to be read
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// True when nothing is queued or in flight
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight() == 0
    }

    /// Lifetime request and byte counters
    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    /// Read-only view of the slots
    pub fn slots(&self) -> &[FetchSlot<T>] {
        &self.slots
    }
}
