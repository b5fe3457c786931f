//! Change detection against the remote `updates.json` endpoint.
//!
//! The API republishes its list of recently touched ids roughly every 30
//! seconds. The poller short-polls that list and only hands a change set to
//! the resolution pipeline when it differs from the previous one. The
//! comparison is exact and order-sensitive: a reordered or resized list
//! counts as changed even if it holds the same ids. That may cause a
//! redundant round, which is harmless because commits are idempotent, but it
//! never hides a genuinely new id.

use crate::config::PollConfig;
use crate::item::parse_updated_ids;
use crate::multiplexer::Multiplexer;
use crate::transport::Transport;
use crate::types::ItemId;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Where the poller currently is in its cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    /// No request for the updates list is outstanding
    Idle,
    /// Waiting for a non-empty updates list
    Waiting,
    /// Comparing a fresh list with the previous one
    Comparing,
}

/// Short-polls the updates endpoint and suppresses unchanged lists
pub struct ChangePoller {
    updates_uri: String,
    poll_interval: Duration,
    idle_interval: Duration,
    previous: Vec<ItemId>,
    state: PollState,
}

impl ChangePoller {
    /// Create a poller for the given updates URI
    pub fn new(updates_uri: impl Into<String>, config: &PollConfig) -> Self {
        Self {
            updates_uri: updates_uri.into(),
            poll_interval: config.poll_interval,
            idle_interval: config.idle_interval,
            previous: Vec::new(),
            state: PollState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> PollState {
        self.state
    }

    /// The most recently adopted change set
    pub fn previous(&self) -> &[ItemId] {
        &self.previous
    }

    /// Compare a fresh list with the previous one
    ///
    /// Returns the list (and adopts it as previous) when it differs in
    /// length or in any position; returns `None` for an identical or empty list.
    pub fn observe(&mut self, ids: Vec<ItemId>) -> Option<Vec<ItemId>> {
        if ids.is_empty() || ids == self.previous {
            return None;
        }
        self.previous.clone_from(&ids);
        Some(ids)
    }

    /// Block until the updates list changes and return the new change set
    pub async fn next_change_set<T: Transport>(&mut self, mux: &mut Multiplexer<T>) -> Vec<ItemId> {
        loop {
            self.state = PollState::Waiting;
            let ids = self.wait_for_updates(mux).await;

            self.state = PollState::Comparing;
            match self.observe(ids) {
                Some(ids) => {
                    self.state = PollState::Idle;
                    return ids;
                }
                None => {
                    info!("No new comments since last update -- sleeping");
                    self.state = PollState::Idle;
                    sleep(self.idle_interval).await;
                }
            }
        }
    }

    /// Request the updates list and pump until it yields at least one id
    ///
    /// An empty, unparseable or failed response means "not ready yet". The
    /// request is re-issued whenever no copy of it is queued or in flight, so
    /// one lost transfer cannot stall the poller.
    async fn wait_for_updates<T: Transport>(&self, mux: &mut Multiplexer<T>) -> Vec<ItemId> {
        mux.enqueue(self.updates_uri.as_str());

        loop {
            mux.pump();
            sleep(self.poll_interval).await;
            mux.collect_completed();

            if let Some(body) = mux.take(&self.updates_uri) {
                let ids = parse_updated_ids(&body);
                if !ids.is_empty() {
                    return ids;
                }
                debug!(bytes = body.len(), "Updates list not ready yet");
            }

            if !mux.is_outstanding(&self.updates_uri) {
                mux.enqueue(self.updates_uri.as_str());
            }
        }
    }
}
