//! Wait for one specific URI on top of the non-blocking multiplexer.

use super::Multiplexer;
use crate::transport::Transport;
use std::time::Duration;

impl<T: Transport> Multiplexer<T> {
    /// Wait for the body of an already enqueued `uri`
    ///
    /// Checks the cache first, then up to `max_retries` times pumps, sleeps
    /// `retry_delay` and checks again. Every pump advances all slots, not just
    /// the one serving `uri`, so concurrent waiters are not starved. Empty
    /// bodies (failed transfers) are consumed and ignored. Returns `None` once
    /// the attempts are exhausted, so a dead endpoint costs at most
    /// `max_retries * retry_delay`.
    pub async fn fetch_blocking(
        &mut self,
        uri: &str,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Option<String> {
        if let Some(body) = self.take_nonempty(uri) {
            return Some(body);
        }

        for _ in 0..max_retries {
            self.pump();
            tokio::time::sleep(retry_delay).await;

            // Completions that landed during the sleep are only visible after collecting
            self.collect_completed();
            if let Some(body) = self.take_nonempty(uri) {
                return Some(body);
            }
        }

        None
    }

    fn take_nonempty(&mut self, uri: &str) -> Option<String> {
        self.take(uri).filter(|body| !body.is_empty())
    }
}
