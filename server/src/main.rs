//! tablerest server: introspects the configured MySQL server and serves every table as a model.
//!
//! Run from repo root: `cargo run -p tablerest-server`
//! Config comes from `TABLEREST_CONFIG` (default `tablerest.json`) or `MYSQL_*` variables.

use tablerest::{app, load, provider, ApiController, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tablerest=info")),
        )
        .init();

    let config = load()?;
    let backend = provider::connect(&config.connection).await?;
    let schema = backend.get_schema(&config.policies, &config.aliases).await?;
    let contexts = schema.contexts()?;
    tracing::info!(models = contexts.len(), page_limit = config.page_limit, "compiled models");

    let state = AppState::new(ApiController::new(backend.clone(), contexts, config.page_limit));
    let router = app(state, config.max_body_bytes);
    let listener = TcpListener::bind(&config.bind).await?;
    tracing::info!("tablerest listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    backend.close().await;
    Ok(())
}
