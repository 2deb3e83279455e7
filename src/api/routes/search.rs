//! Search handler: fetch the corpus and count matching lines.

use crate::api::AppState;
use crate::error::{Error, Result};
use crate::search::LineMatcher;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use tokio_util::sync::CancellationToken;

use super::{SearchQuery, SearchResponse};

/// GET / - Count lines matching a pattern across every document in the corpus
#[utoipa::path(
    get,
    path = "/",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Number of matching lines", body = SearchResponse),
        (status = 400, description = "Query string is malformed or not a valid regular expression", body = crate::error::ApiError),
        (status = 502, description = "Listing or downloading the corpus failed", body = crate::error::ApiError),
        (status = 503, description = "Fetch was cancelled", body = crate::error::ApiError),
        (status = 504, description = "Request deadline elapsed", body = crate::error::ApiError)
    )
)]
pub async fn search(
    State(state): State<AppState>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResponse>> {
    let Query(params) = query.map_err(|rejection| Error::InvalidQuery(rejection.body_text()))?;
    let corpus = &state.config.corpus;
    let query = params
        .q
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| corpus.default_query.clone());

    let matcher = LineMatcher::new(&query)?;

    // Fires when this handler is dropped, e.g. on client disconnect.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let fetch = state
        .fetcher
        .fetch_all(&cancel, &corpus.container, &corpus.prefix);

    let documents = match state.config.server.request_timeout {
        None => fetch.await?,
        Some(timeout) => {
            tokio::pin!(fetch);
            tokio::select! {
                result = &mut fetch => result?,
                _ = tokio::time::sleep(timeout) => {
                    cancel.cancel();
                    // Wait for every download to wind down before answering.
                    let _ = fetch.await;
                    tracing::warn!(
                        query = %query,
                        timeout_ms = timeout.as_millis() as u64,
                        "Search exceeded request deadline"
                    );
                    return Err(Error::RequestTimeout(timeout));
                }
            }
        }
    };

    let count = matcher.count_all(&documents);
    tracing::info!(
        query = %query,
        documents = documents.len(),
        count,
        "Search complete"
    );

    Ok(Json(SearchResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        count,
    }))
}
