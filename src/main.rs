use std::sync::Arc;
use std::time::Duration;

use axum::serve;
use catalogue_server::api::{create_router, ApiContext};
use catalogue_server::config::AppConfig;
use catalogue_server::store::{AcceptAllValidator, InMemoryStore, RestStore, SchemaValidator};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .init();

    println!("Catalogue Server: federated data-exchange metadata catalogue");

    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    let timeout = Duration::from_secs(config.store.timeout_secs);
    let validator: Arc<dyn SchemaValidator> = Arc::new(AcceptAllValidator);

    match &config.store.url {
        Some(url) => {
            println!("Using document engine at {} (index {})", url, config.store.index);
            let store = Arc::new(RestStore::new(url.clone(), config.store.index.clone()));
            let ctx = ApiContext::new(store, validator, timeout);
            run(create_router().with_state(ctx), &config).await?;
        }
        None => {
            println!("No store URL configured, running on the in-memory store");
            let store = Arc::new(InMemoryStore::new());
            let ctx = ApiContext::new(store, validator, timeout);
            run(create_router().with_state(ctx), &config).await?;
        }
    }

    Ok(())
}

async fn run(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("Catalogue server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
