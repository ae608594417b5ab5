use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

use services::{dataset::Dataset, summary::Summarizer};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::new()?;
    let port = config.port;

    // Build our application state
    let state = Arc::new(AppState::new(config));

    // Build our application with a route
    let app = Router::new()
        .merge(routes::routes())
        .merge(routes::query::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Run it
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state. The dataset is loaded once here and never
/// mutated, so handlers read it concurrently without locks.
pub struct AppState {
    pub dataset: Dataset,
    pub summarizer: Summarizer,
}

impl AppState {
    fn new(config: config::Config) -> Self {
        let dataset = Dataset::load(&config.data_file_path);
        let summarizer = Summarizer::new(config.huggingface_api_key);
        Self { dataset, summarizer }
    }
}
