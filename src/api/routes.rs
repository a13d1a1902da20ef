use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::api::handlers::{self, ApiContext};
use crate::store::traits::DocumentStore;

pub fn create_router<S: DocumentStore + 'static>() -> Router<ApiContext<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Search and count
        .route("/search", get(handlers::search::<S>))
        .route("/count", get(handlers::count::<S>))
        // Item lifecycle
        .route("/item", post(handlers::create_item::<S>))
        .route("/item", put(handlers::update_item::<S>))
        .route("/item", get(handlers::get_item::<S>))
        .route("/item", delete(handlers::delete_item::<S>))
        // Instance namespaces
        .route("/instance", post(handlers::create_instance::<S>))
        .route("/instance", delete(handlers::delete_instance::<S>))
        .route("/instances", get(handlers::list_instances::<S>))
        // Relationship traversal
        .route("/relationship", get(handlers::relationship::<S>))
        .route("/relsearch", get(handlers::rel_search::<S>))
}
