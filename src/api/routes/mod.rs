//! Route handlers for the REST API
//!
//! - [`search`] - Line-match counting over the corpus
//! - [`system`] - Health and OpenAPI

use serde::{Deserialize, Serialize};

mod search;
mod system;

pub use search::*;
pub use system::*;

/// Query parameters for GET /
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive regular expression; empty or missing uses the configured default
    pub q: Option<String>,
}

/// Response for GET /
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    /// Server version
    pub version: String,
    /// Number of lines matching the query across all documents
    pub count: u64,
}

/// Response for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Server version
    pub version: String,
}
