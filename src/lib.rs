pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod store;

// Export API types
pub use api::{create_router, ApiContext};

// Export core components
pub use error::{CatalogueError, Result};
pub use logic::{
    ItemHierarchyResolver, QueryChecks, QueryCompiler, RelationshipKey,
    RelationshipTraversalEngine, ResultAssembler,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{AcceptAllValidator, DocumentStore, InMemoryStore, RestStore, SearchHits};

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

/// Start the catalogue server with the configured store backend. Used by
/// the binary and by integration tooling.
pub async fn run_server() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = crate::config::AppConfig::load()?;
    let timeout = Duration::from_secs(config.store.timeout_secs);
    let validator: Arc<dyn store::SchemaValidator> = Arc::new(AcceptAllValidator);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;

    match &config.store.url {
        Some(url) => {
            let store = Arc::new(RestStore::new(url.clone(), config.store.index.clone()));
            let ctx = ApiContext::new(store, validator, timeout);
            let app = create_router().with_state(ctx);
            axum::serve(listener, app).await?;
        }
        None => {
            let store = Arc::new(InMemoryStore::new());
            let ctx = ApiContext::new(store, validator, timeout);
            let app = create_router().with_state(ctx);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
