//! # hnreplies
//!
//! Near-real-time ingester that files every new Hacker News comment under the
//! author of the item it replies to, answering "who replied to user X".
//!
//! ## How it works
//!
//! - A [`ChangePoller`] watches the API's `updates.json` list and hands over
//!   each new change set.
//! - A [`Multiplexer`] keeps a fixed number of fetches in flight and caches
//!   completed bodies until they are claimed.
//! - The [`pipeline`] resolves each changed comment's parent author and files
//!   the comment into a [`ReplyStore`].
//! - An optional HTTP endpoint ([`api`]) serves the latest replies per user.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hnreplies::{Config, FsReplyStore, HttpTransport, ReplyIngester, run_with_shutdown};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let transport = HttpTransport::new(&config.api)?;
//!     let store = Arc::new(FsReplyStore::new(&config.store.data_dir));
//!
//!     let ingester = ReplyIngester::new(config, transport, store)?;
//!     run_with_shutdown(ingester).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Read-side query endpoint
pub mod api;
/// Configuration types
pub mod config;
/// Remote API URIs
pub mod endpoints;
/// Error types
pub mod error;
/// Outer polling loop
pub mod ingester;
/// Item JSON decoding
pub mod item;
/// Bounded-parallel fetching with a completion cache
pub mod multiplexer;
/// Round resolution of changed items
pub mod pipeline;
/// Change detection on the updates list
pub mod poller;
/// Reply storage
pub mod store;
/// Raw GET transport
pub mod transport;
/// Core types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use api::{create_router, start_query_server};
pub use config::Config;
pub use endpoints::Endpoints;
pub use error::{Error, Result};
pub use ingester::ReplyIngester;
pub use item::{Item, ItemData};
pub use multiplexer::Multiplexer;
pub use pipeline::resolve_round;
pub use poller::{ChangePoller, PollState};
pub use store::{FsReplyStore, MemoryReplyStore, ReplyStore};
pub use transport::{HttpTransport, Transport};
pub use types::{FetchStats, ItemId, ItemType, RoundReport};

/// Run the ingester until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// A round in progress is abandoned; replies already filed stay filed.
///
/// # Example
///
/// ```no_run
/// use hnreplies::{Config, HttpTransport, MemoryReplyStore, ReplyIngester, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let transport = HttpTransport::new(&config.api)?;
///     let ingester = ReplyIngester::new(config, transport, Arc::new(MemoryReplyStore::new()))?;
///
///     run_with_shutdown(ingester).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown<T, S>(mut ingester: ReplyIngester<T, S>) -> Result<()>
where
    T: Transport,
    S: ReplyStore + ?Sized,
{
    tokio::select! {
        result = ingester.run() => result,
        _ = wait_for_signal() => Ok(()),
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut term), Ok(mut int)) => {
            let received = tokio::select! {
                _ = term.recv() => "SIGTERM",
                _ = int.recv() => "SIGINT",
            };
            tracing::info!(signal = received, "Stopping ingester");
        }
        // Registration can fail in restricted environments (containers, tests)
        (Ok(mut only), Err(e)) | (Err(e), Ok(mut only)) => {
            tracing::warn!(error = %e, "Only one termination signal is being watched");
            only.recv().await;
            tracing::info!("Stopping ingester");
        }
        (Err(e), Err(_)) => {
            tracing::warn!(error = %e, "No termination signals available, waiting for Ctrl+C");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Stopping ingester");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot watch for Ctrl+C, ingester runs until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("Stopping ingester");
}
