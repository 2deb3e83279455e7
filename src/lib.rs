//! # corpus-fetch
//!
//! Concurrent fan-out/fan-in download of every object under a prefix of an
//! object store container, with a small HTTP service that counts lines
//! matching a regular expression across the downloaded documents.
//!
//! ## Design
//!
//! - **One task per object** - every listed object is downloaded concurrently
//! - **Positional results** - contents come back in listing order, not completion order
//! - **All or nothing** - any failure discards all content and surfaces one error
//! - **No leaks** - every task is joined and every reader released before returning
//!
//! ## Quick Start
//!
//! ```no_run
//! use corpus_fetch::{ConcurrentFetcher, store::LocalStore};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = ConcurrentFetcher::new(Arc::new(LocalStore::new("/srv/corpus")));
//!
//!     let documents = fetcher
//!         .fetch_all(&CancellationToken::new(), "dataflow-samples", "shakespeare/")
//!         .await?;
//!
//!     println!("fetched {} documents", documents.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API server
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Concurrent fetch of every object under a prefix
pub mod fetcher;
/// Line matching over fetched documents
pub mod search;
/// Object store abstraction and backends
pub mod store;
/// Core types
pub mod types;

use std::sync::Arc;

pub use config::{ApiConfig, Config, CorpusConfig, StoreConfig};
pub use error::{ApiError, Error, FetchError, Result, StoreError, ToHttpStatus};
pub use fetcher::ConcurrentFetcher;
pub use search::LineMatcher;
pub use store::{ObjectStore, from_config as store_from_config};
pub use types::ObjectId;

/// Validate `config` and serve the search API over `store` until SIGINT or SIGTERM.
///
/// In-flight requests are allowed to finish after the signal arrives.
///
/// # Example
///
/// ```no_run
/// use corpus_fetch::{Config, store};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_json_file("corpus-fetch.json")?;
///     let store = store::from_config(&config.store)?;
///
///     corpus_fetch::serve(config, store).await?;
///     Ok(())
/// }
/// ```
pub async fn serve(config: Config, store: Arc<dyn ObjectStore>) -> Result<()> {
    config.validate()?;

    tracing::info!(
        container = %config.corpus.container,
        prefix = %config.corpus.prefix,
        "Serving corpus search"
    );

    let fetcher = ConcurrentFetcher::new(store);
    api::start_api_server(fetcher, Arc::new(config), wait_for_signal()).await
}

/// Resolves once the process is asked to stop.
async fn wait_for_signal() {
    let signal = shutdown_signal().await;
    tracing::info!(signal, "Shutdown requested, finishing in-flight searches");
}

/// Name of the first shutdown signal received.
///
/// Handlers are registered when this is called, not when it is first polled.
/// If neither SIGTERM nor SIGINT can be registered, falls back to Ctrl+C.
#[cfg(unix)]
fn shutdown_signal() -> impl std::future::Future<Output = &'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let terminate = signal(SignalKind::terminate());
    let interrupt = signal(SignalKind::interrupt());

    async move {
        match (terminate, interrupt) {
            (Ok(mut terminate), Ok(mut interrupt)) => tokio::select! {
                _ = terminate.recv() => "SIGTERM",
                _ = interrupt.recv() => "SIGINT",
            },
            (Ok(mut terminate), Err(e)) => {
                tracing::warn!(error = %e, "SIGINT handler unavailable, search server stops on SIGTERM only");
                terminate.recv().await;
                "SIGTERM"
            }
            (Err(e), Ok(mut interrupt)) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, search server stops on SIGINT only");
                interrupt.recv().await;
                "SIGINT"
            }
            (Err(e), Err(_)) => {
                tracing::error!(error = %e, "No signal handlers available, using Ctrl+C");
                ctrl_c().await
            }
        }
    }
}

#[cfg(not(unix))]
fn shutdown_signal() -> impl std::future::Future<Output = &'static str> {
    ctrl_c()
}

/// Waits for Ctrl+C. If that cannot be listened for either, never resolves,
/// so the server keeps running until the process is killed.
async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C, search server has no shutdown signal");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}
