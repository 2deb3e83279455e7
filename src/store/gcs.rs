//! Google Cloud Storage backend over the JSON API.
//!
//! Listing pages through `GET /storage/v1/b/{bucket}/o` following
//! `nextPageToken`; downloads use `alt=media` on the object resource.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use tokio_util::io::StreamReader;

use super::{ObjectListing, ObjectReader, ObjectStore, ensure_container_name};
use crate::error::{Error, Result, StoreError};
use crate::types::ObjectId;

/// One page of an object listing
#[derive(Debug, Deserialize)]
struct ListPage {
    #[serde(default)]
    items: Vec<ObjectResource>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectResource {
    name: String,
}

/// [`ObjectStore`] backed by the Google Cloud Storage JSON API
#[derive(Clone, Debug)]
pub struct GcsStore {
    client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl GcsStore {
    /// Create a store talking to `endpoint` (e.g. `https://storage.googleapis.com`).
    ///
    /// Requests are anonymous unless `access_token` is set.
    pub fn new(endpoint: impl Into<String>, access_token: Option<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint).map_err(|e| Error::Config {
            message: format!("invalid GCS endpoint {endpoint:?}: {e}"),
            key: Some("store.endpoint".to_string()),
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("corpus-fetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn objects_url(&self, container: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o",
            self.endpoint,
            urlencoding::encode(container)
        )
    }

    fn object_url(&self, container: &str, object: &ObjectId) -> String {
        format!(
            "{}/{}",
            self.objects_url(container),
            urlencoding::encode(object.as_str())
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn list_page(
        &self,
        container: &str,
        prefix: &str,
        page_token: Option<&str>,
    ) -> std::result::Result<ListPage, StoreError> {
        let mut request = self
            .get(&self.objects_url(container))
            .query(&[("fields", "items(name),nextPageToken")]);
        if !prefix.is_empty() {
            request = request.query(&[("prefix", prefix)]);
        }
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::ContainerNotFound(container.to_string()));
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| StoreError::InvalidResponse(format!("malformed object listing: {e}")))
    }
}

async fn status_error(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => body,
        _ => status.canonical_reason().unwrap_or("unknown").to_string(),
    };
    StoreError::Status {
        status: status.as_u16(),
        message,
    }
}

#[async_trait::async_trait]
impl ObjectStore for GcsStore {
    fn list<'a>(&'a self, container: &'a str, prefix: &'a str) -> ObjectListing<'a> {
        if let Err(e) = ensure_container_name(container) {
            return stream::once(async move { Err(e) }).boxed();
        }

        // State is the token of the next page to fetch; `None` ends the listing.
        let pages = stream::try_unfold(Some(None::<String>), move |next| async move {
            let Some(page_token) = next else {
                return Ok::<_, StoreError>(None);
            };
            let page = self
                .list_page(container, prefix, page_token.as_deref())
                .await?;
            // An empty token marks the last page just like an absent one.
            let next = page.next_page_token.filter(|token| !token.is_empty());
            tracing::debug!(
                container,
                prefix,
                items = page.items.len(),
                more = next.is_some(),
                "Fetched listing page"
            );
            Ok(Some((page.items, next.map(Some))))
        });

        pages
            .map_ok(|items| {
                stream::iter(
                    items
                        .into_iter()
                        .map(|item| Ok::<_, StoreError>(ObjectId::from(item.name))),
                )
            })
            .try_flatten()
            .boxed()
    }

    async fn open(
        &self,
        container: &str,
        object: &ObjectId,
    ) -> std::result::Result<ObjectReader, StoreError> {
        ensure_container_name(container)?;

        let response = self
            .get(&self.object_url(container, object))
            .query(&[("alt", "media")])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::ObjectNotFound(object.to_string()));
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(body))))
    }
}
