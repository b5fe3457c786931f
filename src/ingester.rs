//! The outer polling loop: wait for a change set, resolve it, report, repeat.

use crate::config::Config;
use crate::endpoints::Endpoints;
use crate::error::Result;
use crate::multiplexer::Multiplexer;
use crate::pipeline::resolve_round;
use crate::poller::ChangePoller;
use crate::store::ReplyStore;
use crate::transport::Transport;
use crate::types::RoundReport;
use std::sync::Arc;
use tracing::{info, warn};

/// Continuously files replies for every comment the updates feed reports
pub struct ReplyIngester<T: Transport, S: ReplyStore + ?Sized> {
    mux: Multiplexer<T>,
    poller: ChangePoller,
    endpoints: Endpoints,
    store: Arc<S>,
    config: Config,
}

impl<T: Transport, S: ReplyStore + ?Sized> ReplyIngester<T, S> {
    /// Validate `config` and wire up the multiplexer, endpoints and poller
    pub fn new(config: Config, transport: T, store: Arc<S>) -> Result<Self> {
        Self::with_shared(config, Arc::new(transport), store)
    }

    /// Same as [`new`](Self::new) for a transport the caller keeps a handle to
    pub fn with_shared(config: Config, transport: Arc<T>, store: Arc<S>) -> Result<Self> {
        config.validate()?;

        let endpoints = Endpoints::new(&config.api.base_url)?;
        let mux = Multiplexer::with_shared(transport, config.fetch.max_parallel);
        let poller = ChangePoller::new(endpoints.updates(), &config.poll);

        Ok(Self {
            mux,
            poller,
            endpoints,
            store,
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Poller driving the rounds
    pub fn poller(&self) -> &ChangePoller {
        &self.poller
    }

    /// Multiplexer shared by the poller and the rounds
    pub fn multiplexer(&self) -> &Multiplexer<T> {
        &self.mux
    }

    /// Wait for the next change set and resolve it
    pub async fn run_once(&mut self) -> RoundReport {
        let changed = self.poller.next_change_set(&mut self.mux).await;
        info!(count = changed.len(), "{} items have been updated", changed.len());

        let report = resolve_round(
            &mut self.mux,
            &self.endpoints,
            self.store.as_ref(),
            &self.config.fetch,
            &changed,
        )
        .await;

        info!("{}", report);
        if report.is_slow(self.config.poll.slow_round_threshold) {
            warn!(
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Round is taking too long, consider raising fetch.max_parallel"
            );
        }

        self.mux.discard_unclaimed();
        report
    }

    /// Run rounds forever
    pub async fn run(&mut self) -> Result<()> {
        info!(base_url = %self.config.api.base_url, "Connecting to the HN API");
        loop {
            self.run_once().await;
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryReplyStore;
    use crate::test_helpers::ScriptedTransport;
    use crate::types::ItemId;
    use std::time::Duration;

    const BASE: &str = "http://api.test/v0/";
    const UPDATES: &str = "http://api.test/v0/updates.json";

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.api.base_url = BASE.to_string();
        config.fetch.max_parallel = 4;
        config.fetch.item_retries = 5;
        config.fetch.item_retry_delay = Duration::from_millis(5);
        config.poll.poll_interval = Duration::from_millis(5);
        config.poll.idle_interval = Duration::from_millis(10);
        config
    }

    fn scripted() -> Arc<ScriptedTransport> {
        Arc::new(
            ScriptedTransport::new()
                .with_body(UPDATES, r#"{"items":[100]}"#)
                .with_body(
                    "http://api.test/v0/item/100.json",
                    r#"{"by":"alice","id":100,"parent":50,"type":"comment"}"#,
                )
                .with_body(
                    "http://api.test/v0/item/50.json",
                    r#"{"by":"bob","id":50,"type":"story"}"#,
                ),
        )
    }

    #[tokio::test]
    async fn run_once_files_the_change_set() {
        let store = Arc::new(MemoryReplyStore::new());
        let mut ingester =
            ReplyIngester::with_shared(fast_config(), scripted(), Arc::clone(&store)).unwrap();

        let report = tokio::time::timeout(Duration::from_secs(2), ingester.run_once())
            .await
            .unwrap();

        assert_eq!(report.updated, 1);
        assert!(store.get("bob", ItemId(100)).is_some());
        assert_eq!(ingester.poller().previous(), &[ItemId(100)]);
        assert_eq!(ingester.multiplexer().cached(), 0, "nothing left over for the next round");
    }

    #[tokio::test]
    async fn unchanged_feed_does_not_start_a_second_round() {
        let transport = scripted();
        let store = Arc::new(MemoryReplyStore::new());
        let mut ingester =
            ReplyIngester::with_shared(fast_config(), Arc::clone(&transport), store).unwrap();

        ingester.run_once().await;
        let second = tokio::time::timeout(Duration::from_millis(150), ingester.run_once()).await;
        assert!(second.is_err(), "identical updates list must be suppressed");

        transport.set_body(UPDATES, r#"{"items":[100,101]}"#);
        let report = tokio::time::timeout(Duration::from_secs(2), ingester.run_once())
            .await
            .unwrap();
        assert_eq!(report.comments, 1, "101 is unknown to the transport");
        assert_eq!(report.errors, 1);
    }

    #[tokio::test]
    async fn run_keeps_going_until_cancelled() {
        let store = Arc::new(MemoryReplyStore::new());
        let mut ingester =
            ReplyIngester::with_shared(fast_config(), scripted(), Arc::clone(&store)).unwrap();

        let result = tokio::time::timeout(Duration::from_millis(200), ingester.run()).await;

        assert!(result.is_err(), "run only ends when cancelled");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = fast_config();
        config.fetch.max_parallel = 0;

        let result = ReplyIngester::new(config, ScriptedTransport::new(), Arc::new(MemoryReplyStore::new()));
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
