//! Search server demo
//!
//! Serves line-match counts over the configured corpus. With no arguments it
//! searches the public `gs://dataflow-samples/shakespeare/` objects anonymously.
//!
//! ```bash
//! cargo run --example search_server                        # defaults
//! cargo run --example search_server -- corpus-fetch.json   # JSON config file
//! RUST_LOG=corpus_fetch=debug cargo run --example search_server
//! ```
//!
//! Then query it:
//!
//! ```bash
//! curl 'http://localhost:8080/?q=romeo'
//! curl 'http://localhost:8080/openapi.json'
//! ```

use corpus_fetch::{Config, store};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,corpus_fetch=debug,tower_http=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(path = %path, "Loading configuration");
            Config::from_json_file(&path)?
        }
        None => Config::default(),
    };

    let store = store::from_config(&config.store)?;

    println!("Searching {}/{}", config.corpus.container, config.corpus.prefix);
    println!("  GET http://{}/?q=<pattern>", config.server.bind_address);
    println!("  GET http://{}/health", config.server.bind_address);
    println!("Press Ctrl+C to stop");

    corpus_fetch::serve(config, store).await?;

    Ok(())
}
