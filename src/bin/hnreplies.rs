//! Reply ingester daemon
//!
//! Takes no flags. Set `HNREPLIES_CONFIG` to a JSON config file to override
//! the defaults, and `RUST_LOG` to change verbosity. Progress goes to
//! stdout; warnings and errors go to stderr.

use hnreplies::{Config, FsReplyStore, HttpTransport, ReplyIngester, run_with_shutdown};
use std::sync::Arc;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const CONFIG_ENV: &str = "HNREPLIES_CONFIG";

/// WARN and ERROR events to `problems`, everything else to `progress`
fn split_writer<P, O>(problems: P, progress: O) -> impl for<'a> MakeWriter<'a> + 'static
where
    P: for<'a> MakeWriter<'a> + 'static,
    O: for<'a> MakeWriter<'a> + 'static,
{
    problems.with_max_level(Level::WARN).or_else(progress)
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(split_writer(std::io::stderr, std::io::stdout))
        .init();
}

fn load_config() -> hnreplies::Result<Config> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            tracing::info!(path = ?path, "Loading configuration");
            Config::from_file(path)
        }
        None => Ok(Config::default()),
    }
}

// Single-threaded on purpose: the multiplexer is driven by one owner
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = load_config()?;

    let transport = HttpTransport::new(&config.api)?;
    let store = Arc::new(FsReplyStore::new(&config.store.data_dir));

    if config.server.enabled {
        let store = Arc::clone(&store);
        let server = config.server.clone();
        tokio::spawn(async move {
            if let Err(e) = hnreplies::start_query_server(store, &server).await {
                tracing::error!(error = %e, "Query server failed");
            }
        });
    }

    let ingester = ReplyIngester::new(config, transport, store)?;
    run_with_shutdown(ingester).await?;

    Ok(())
}
