//! Fan-out/fan-in: one task per identifier, outcomes collected by listing index.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::download::download_object;
use crate::error::FetchError;
use crate::store::ObjectStore;
use crate::types::ObjectId;

/// Outcome of one download, tagged with the identifier's listing index.
type IndexedOutcome = (usize, Result<String, FetchError>);

/// Download every object concurrently and return contents in listing order.
///
/// All outcomes are received and all task handles joined before returning,
/// whether or not a failure was seen along the way.
pub(super) async fn download_all(
    store: Arc<dyn ObjectStore>,
    cancel: &CancellationToken,
    container: &str,
    objects: Vec<ObjectId>,
) -> Result<Vec<String>, FetchError> {
    let total = objects.len();
    let container: Arc<str> = Arc::from(container);

    // Capacity == task count, so no sender ever waits on the receiver.
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<IndexedOutcome>(total.max(1));

    let mut handles = Vec::with_capacity(total);
    for (index, object) in objects.iter().enumerate() {
        handles.push(spawn_download(
            index,
            object.clone(),
            Arc::clone(&store),
            Arc::clone(&container),
            cancel.clone(),
            outcome_tx.clone(),
        ));
    }
    drop(outcome_tx);

    let mut slots: Vec<Option<String>> = vec![None; total];
    let mut failure = FirstFailure::default();

    while let Some((index, outcome)) = outcome_rx.recv().await {
        match outcome {
            Ok(content) => slots[index] = Some(content),
            Err(e) => failure.record(index, e),
        }
    }

    for (index, handle) in handles.into_iter().enumerate() {
        if let Err(join_error) = handle.await {
            tracing::error!(
                index,
                object = %objects[index],
                error = %join_error,
                "Download task ended without reporting"
            );
            failure.record(
                index,
                FetchError::TaskAborted {
                    object: objects[index].to_string(),
                    reason: join_error.to_string(),
                },
            );
        }
    }

    if let Some(error) = failure.into_error() {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        return Err(error);
    }

    slots
        .into_iter()
        .zip(objects)
        .map(|(slot, object)| {
            slot.ok_or_else(|| FetchError::TaskAborted {
                object: object.to_string(),
                reason: "no outcome reported".to_string(),
            })
        })
        .collect()
}

fn spawn_download(
    index: usize,
    object: ObjectId,
    store: Arc<dyn ObjectStore>,
    container: Arc<str>,
    cancel: CancellationToken,
    outcome_tx: mpsc::Sender<IndexedOutcome>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // Cancelling drops the in-flight open/read, which releases the reader.
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = download_object(store.as_ref(), &container, &object) => result,
        };

        match &outcome {
            Ok(content) => {
                tracing::debug!(index, object = %object, bytes = content.len(), "Downloaded object")
            }
            Err(FetchError::Cancelled) => {
                tracing::debug!(index, object = %object, "Download cancelled")
            }
            Err(e) => tracing::warn!(index, object = %object, error = %e, "Download failed"),
        }

        // The receiver outlives every sender; a send error cannot happen.
        let _ = outcome_tx.send((index, outcome)).await;
    })
}

/// Keeps the failure with the lowest listing index.
#[derive(Default)]
struct FirstFailure {
    lowest: Option<(usize, FetchError)>,
}

impl FirstFailure {
    fn record(&mut self, index: usize, error: FetchError) {
        match &self.lowest {
            Some((current, _)) if *current <= index => {}
            _ => self.lowest = Some((index, error)),
        }
    }

    fn into_error(self) -> Option<FetchError> {
        self.lowest.map(|(_, error)| error)
    }
}
