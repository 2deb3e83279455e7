//! Application state for the API server

use crate::{ConcurrentFetcher, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; both fields are cheap to clone.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Fetcher over the configured object store
    pub fetcher: ConcurrentFetcher,

    /// Configuration (corpus location, default query, request deadline)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(fetcher: ConcurrentFetcher, config: Arc<Config>) -> Self {
        Self { fetcher, config }
    }
}
