//! Per-round resolution of changed items into filed replies.
//!
//! A round runs three phases strictly in order:
//!
//! 1. **Fetch & classify** every changed id. Comments are kept and their
//!    parent is queued for lookup; everything else is only counted.
//! 2. **Resolve parents** whose author is not yet known this round.
//! 3. **Commit** each comment under its parent's author.
//!
//! Failures are contained to the item they concern: they are logged, counted
//! in the [`RoundReport`], and the round carries on.

use crate::config::FetchConfig;
use crate::endpoints::Endpoints;
use crate::item::{Item, ItemData};
use crate::multiplexer::Multiplexer;
use crate::store::ReplyStore;
use crate::transport::Transport;
use crate::types::{ItemId, ItemType, RoundReport};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Working state of one round, discarded after commit
#[derive(Debug, Default)]
pub struct RoundState {
    /// Known authors, for changed items and their parents alike
    pub author_by_id: HashMap<ItemId, String>,
    /// Raw JSON of every comment in the change set
    pub raw_by_id: HashMap<ItemId, String>,
    /// Parsed comments, committed in ascending id order
    pub comments_by_id: BTreeMap<ItemId, Item>,
    /// Parents still to resolve; may hold duplicates
    pub pending_parents: Vec<ItemId>,
}

/// Drives one round against a multiplexer and a reply store
pub struct Resolver<'a, T: Transport, S: ReplyStore + ?Sized> {
    mux: &'a mut Multiplexer<T>,
    endpoints: &'a Endpoints,
    store: &'a S,
    retries: u32,
    retry_delay: Duration,
    state: RoundState,
    report: RoundReport,
}

impl<'a, T: Transport, S: ReplyStore + ?Sized> Resolver<'a, T, S> {
    /// Prepare a round using the retry budget from `fetch`
    pub fn new(
        mux: &'a mut Multiplexer<T>,
        endpoints: &'a Endpoints,
        store: &'a S,
        fetch: &FetchConfig,
    ) -> Self {
        Self {
            mux,
            endpoints,
            store,
            retries: fetch.item_retries,
            retry_delay: fetch.item_retry_delay,
            state: RoundState::default(),
            report: RoundReport::default(),
        }
    }

    /// Run all three phases over `changed` and report what happened
    pub async fn run(mut self, changed: &[ItemId]) -> RoundReport {
        let started = Instant::now();

        // Get the first batch of item fetches in flight before waiting on any of them
        for &id in changed {
            self.mux.enqueue(self.endpoints.item(id));
        }
        self.mux.pump();

        self.fetch_and_classify(changed).await;
        self.resolve_parents().await;
        self.commit().await;

        self.report.fetch = self.mux.stats();
        self.report.elapsed = started.elapsed();
        self.report
    }

    /// Phase A
    async fn fetch_and_classify(&mut self, changed: &[ItemId]) {
        for &id in changed {
            if self.state.author_by_id.contains_key(&id) {
                continue;
            }

            let Some(raw) = self.fetch_item(id).await else {
                continue;
            };

            let data = ItemData::parse(&raw);
            let Some(author) = data.author() else {
                self.report.errors += 1;
                error!(item_id = %id, "Failed to parse 'by' for item");
                continue;
            };
            self.state.author_by_id.insert(id, author.to_string());

            match data.item_type() {
                ItemType::Comment => {
                    self.report.comments += 1;
                    let comment = Item::from_data(&data);
                    debug!(
                        item_id = %id,
                        parent = %comment.parent,
                        posted_at = ?comment.posted_at(),
                        "Comment needs its parent's author"
                    );

                    // Who is this a reply to? Ask for the parent now, resolve it later
                    self.mux.enqueue(self.endpoints.item(comment.parent));
                    self.state.pending_parents.push(comment.parent);

                    self.state.raw_by_id.insert(id, raw);
                    self.state.comments_by_id.insert(id, comment);
                }
                other => {
                    self.report.other += 1;
                    debug!(item_id = %id, item_type = ?other, "Skipping non-comment item");
                }
            }
        }
    }

    /// Phase B
    async fn resolve_parents(&mut self) {
        let parents = std::mem::take(&mut self.state.pending_parents);

        for parent in parents {
            if self.state.author_by_id.contains_key(&parent) {
                continue;
            }

            let Some(raw) = self.fetch_item(parent).await else {
                continue;
            };

            match ItemData::parse(&raw).author() {
                Some(author) => {
                    self.state.author_by_id.insert(parent, author.to_string());
                }
                None => {
                    self.report.errors += 1;
                    error!(item_id = %parent, "Failed to parse 'by' for item");
                }
            }
        }
    }

    /// Phase C
    async fn commit(&mut self) {
        for (id, comment) in &self.state.comments_by_id {
            let Some(recipient) = self.state.author_by_id.get(&comment.parent) else {
                self.report.unknown += 1;
                warn!(item_id = %id, parent = %comment.parent, "Parent of item is unknown");
                continue;
            };
            let Some(raw) = self.state.raw_by_id.get(id) else {
                continue;
            };

            match self.store.put(recipient, *id, raw).await {
                Ok(()) => self.report.updated += 1,
                Err(e) => {
                    self.report.errors += 1;
                    error!(item_id = %id, recipient = %recipient, error = %e, "Failed to file reply");
                }
            }
        }
    }

    /// Wait for an item body, counting an error when the retry budget runs out
    async fn fetch_item(&mut self, id: ItemId) -> Option<String> {
        let uri = self.endpoints.item(id);
        let body = self
            .mux
            .fetch_blocking(&uri, self.retries, self.retry_delay)
            .await;

        if body.is_none() {
            self.report.errors += 1;
            error!(item_id = %id, "Failed to get update for item");
        }
        body
    }
}

/// Resolve one change set and file its replies
pub async fn resolve_round<T, S>(
    mux: &mut Multiplexer<T>,
    endpoints: &Endpoints,
    store: &S,
    fetch: &FetchConfig,
    changed: &[ItemId],
) -> RoundReport
where
    T: Transport,
    S: ReplyStore + ?Sized,
{
    Resolver::new(mux, endpoints, store, fetch).run(changed).await
}
