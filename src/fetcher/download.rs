//! Single-object download.

use tokio::io::AsyncReadExt;

use crate::error::{FetchError, StoreError};
use crate::store::ObjectStore;
use crate::types::ObjectId;

/// Open `object` and read it to the end.
///
/// The reader is owned by this future, so it is released on every exit path,
/// including when the future is dropped mid-read.
pub(super) async fn download_object(
    store: &dyn ObjectStore,
    container: &str,
    object: &ObjectId,
) -> Result<String, FetchError> {
    let download_error = |source: StoreError| FetchError::Download {
        object: object.to_string(),
        source,
    };

    let mut reader = store.open(container, object).await.map_err(download_error)?;

    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| download_error(StoreError::Io(e)))?;

    Ok(decode_text(object, bytes))
}

/// Decode content as UTF-8, replacing invalid sequences with U+FFFD.
fn decode_text(object: &ObjectId, bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                object = %object,
                valid_up_to = e.utf8_error().valid_up_to(),
                "Object is not valid UTF-8, decoding lossily"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}
