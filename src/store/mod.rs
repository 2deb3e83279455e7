//! Object store abstraction and backends
//!
//! The fetcher only needs two things from a store: a listing of identifiers
//! under a prefix, and a read stream for one identifier. [`ObjectStore`] is
//! that seam; [`GcsStore`] and [`LocalStore`] implement it.

use std::sync::Arc;

use futures::stream::BoxStream;
use tokio::io::AsyncRead;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::types::ObjectId;

mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

/// Lazy, finite, non-restartable sequence of identifiers produced by a listing
pub type ObjectListing<'a> = BoxStream<'a, std::result::Result<ObjectId, StoreError>>;

/// Read stream for one object; dropping it releases the underlying resource
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// Abstraction over an object store, shared read-only across concurrent downloads.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// List identifiers in `container` whose names start with `prefix`.
    ///
    /// Items are yielded in the order the store reports them. Errors (missing
    /// container, unreachable store, broken page) are yielded in-stream.
    fn list<'a>(&'a self, container: &'a str, prefix: &'a str) -> ObjectListing<'a>;

    /// Open a read stream over the full content of one object.
    async fn open(
        &self,
        container: &str,
        object: &ObjectId,
    ) -> std::result::Result<ObjectReader, StoreError>;
}

/// Build the configured backend.
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    match config {
        StoreConfig::Gcs {
            endpoint,
            access_token,
        } => {
            let store = GcsStore::new(endpoint.clone(), access_token.clone())?;
            tracing::info!(endpoint = %endpoint, authenticated = access_token.is_some(), "Using GCS object store");
            Ok(Arc::new(store))
        }
        StoreConfig::Local { root } => {
            tracing::info!(root = %root.display(), "Using local object store");
            Ok(Arc::new(LocalStore::new(root.clone())))
        }
    }
}

/// Reject names that are empty; backends add their own restrictions.
pub(crate) fn ensure_container_name(container: &str) -> std::result::Result<(), StoreError> {
    if container.is_empty() {
        return Err(StoreError::InvalidName {
            name: container.to_string(),
            reason: "container name must not be empty".to_string(),
        });
    }
    Ok(())
}
