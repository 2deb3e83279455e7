//! Configuration types for corpus-fetch
//!
//! Every field has a default, so an empty JSON object is a valid configuration
//! that searches the public `dataflow-samples/shakespeare/` corpus.

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Object store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Which objects are searched and the default query
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ApiConfig,
}

impl Config {
    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Check that the configuration can be used to serve requests
    pub fn validate(&self) -> Result<()> {
        if self.corpus.container.trim().is_empty() {
            return Err(config_error("container must not be empty", "corpus.container"));
        }

        if let Err(e) = crate::search::LineMatcher::new(&self.corpus.default_query) {
            return Err(config_error(
                format!("default query does not compile: {e}"),
                "corpus.default_query",
            ));
        }

        match &self.store {
            StoreConfig::Gcs { endpoint, .. } => {
                let url = url::Url::parse(endpoint).map_err(|e| {
                    config_error(format!("invalid endpoint {endpoint:?}: {e}"), "store.endpoint")
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(config_error(
                        format!("endpoint must be http or https, got {}", url.scheme()),
                        "store.endpoint",
                    ));
                }
            }
            StoreConfig::Local { root } => {
                if root.as_os_str().is_empty() {
                    return Err(config_error("root must not be empty", "store.root"));
                }
            }
        }

        if self.server.request_timeout == Some(Duration::ZERO) {
            return Err(config_error(
                "request timeout must be greater than zero",
                "server.request_timeout",
            ));
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

/// Object store backend selection
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Google Cloud Storage JSON API (or a compatible emulator)
    Gcs {
        /// Base URL of the API (default: "https://storage.googleapis.com")
        #[serde(default = "default_gcs_endpoint")]
        endpoint: String,

        /// OAuth bearer token; requests are anonymous when unset
        #[serde(default)]
        access_token: Option<String>,
    },

    /// A local directory whose sub-directories act as containers
    Local {
        /// Directory holding one sub-directory per container
        root: PathBuf,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Gcs {
            endpoint: default_gcs_endpoint(),
            access_token: None,
        }
    }
}

/// The corpus searched by the HTTP API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Container (bucket) holding the documents (default: "dataflow-samples")
    #[serde(default = "default_container")]
    pub container: String,

    /// Prefix selecting the documents; empty selects everything (default: "shakespeare/")
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Query used when a request has no `q` parameter (default: "hello")
    #[serde(default = "default_query")]
    pub default_query: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            prefix: default_prefix(),
            default_query: default_query(),
        }
    }
}

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: false)
    #[serde(default)]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Deadline for a single search request in seconds (None = no deadline)
    ///
    /// When it elapses the fetch is cancelled, in-flight downloads are
    /// aborted and the request fails with 504.
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: false,
            cors_origins: default_cors_origins(),
            request_timeout: None,
        }
    }
}

fn default_gcs_endpoint() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_container() -> String {
    "dataflow-samples".to_string()
}

fn default_prefix() -> String {
    "shakespeare/".to_string()
}

fn default_query() -> String {
    "hello".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
