//! Concurrent fetch of every object under a prefix.
//!
//! Split into focused submodules:
//! - [`lister`] - Drains the store listing into an ordered identifier list
//! - [`download`] - Reads one object into a string
//! - [`aggregate`] - One task per identifier, indexed fan-in, failure selection

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::store::ObjectStore;

mod aggregate;
mod download;
mod lister;

#[cfg(test)]
pub(crate) mod test_helpers;


/// Downloads every object under a prefix concurrently and returns their
/// contents in listing order.
///
/// The fetcher holds no per-call state; one instance can serve any number of
/// concurrent [`fetch_all`](Self::fetch_all) calls.
#[derive(Clone)]
pub struct ConcurrentFetcher {
    store: Arc<dyn ObjectStore>,
}

impl ConcurrentFetcher {
    /// Create a fetcher over `store`
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The store this fetcher reads from
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// List `container` under `prefix` and download every listed object.
    ///
    /// On success the result holds one string per listed object, in listing
    /// order regardless of which download finished first. Any failure discards
    /// all content and surfaces a single error: [`FetchError::Cancelled`] if
    /// `cancel` fired, otherwise the failure of the object listed first.
    ///
    /// Every spawned download has finished and released its reader by the
    /// time this returns, including on failure and cancellation.
    pub async fn fetch_all(
        &self,
        cancel: &CancellationToken,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<String>, FetchError> {
        let started = Instant::now();

        let objects = lister::list_objects(self.store.as_ref(), cancel, container, prefix).await?;
        if objects.is_empty() {
            tracing::debug!(container, prefix, "Listing is empty, nothing to download");
            return Ok(Vec::new());
        }

        let count = objects.len();
        tracing::debug!(container, prefix, objects = count, "Dispatching downloads");

        let contents =
            aggregate::download_all(Arc::clone(&self.store), cancel, container, objects).await?;

        tracing::info!(
            container,
            prefix,
            objects = count,
            bytes = contents.iter().map(String::len).sum::<usize>(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched all objects"
        );

        Ok(contents)
    }
}

impl std::fmt::Debug for ConcurrentFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentFetcher").finish_non_exhaustive()
    }
}
