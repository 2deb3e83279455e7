//! Listing: container + prefix to an ordered list of identifiers.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, StoreError};
use crate::store::{ObjectStore, ensure_container_name};
use crate::types::ObjectId;

/// Drain the store listing for `container`/`prefix`.
///
/// Identifiers keep the order the store reports them in. Entries with an empty
/// name are skipped. The first in-stream error aborts the listing.
pub(super) async fn list_objects(
    store: &dyn ObjectStore,
    cancel: &CancellationToken,
    container: &str,
    prefix: &str,
) -> Result<Vec<ObjectId>, FetchError> {
    let listing_error = |source: StoreError| FetchError::Listing {
        container: container.to_string(),
        prefix: prefix.to_string(),
        source,
    };

    ensure_container_name(container).map_err(listing_error)?;

    let mut listing = store.list(container, prefix);
    let mut objects = Vec::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(container, prefix, listed = objects.len(), "Listing cancelled");
                return Err(FetchError::Cancelled);
            }
            next = listing.next() => next,
        };

        match next {
            None => break,
            Some(Ok(object)) if object.is_empty() => {
                tracing::debug!(container, prefix, "Skipping listing entry with empty name");
            }
            Some(Ok(object)) => objects.push(object),
            Some(Err(e)) => {
                tracing::warn!(container, prefix, error = %e, "Listing failed");
                return Err(listing_error(e));
            }
        }
    }

    Ok(objects)
}
