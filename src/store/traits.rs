use serde_json::Value;

use crate::error::Result;
use crate::model::{Id, QueryPlan};

/// Result page from the document engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchHits {
    pub total: u64,
    pub docs: Vec<Value>,
}

/// Gateway to the backing document engine. All calls are single-attempt;
/// retries, if wanted, belong to the caller.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn search(&self, plan: &QueryPlan) -> Result<SearchHits>;
    async fn count(&self, plan: &QueryPlan) -> Result<u64>;
    /// Terms aggregation buckets (`{"key": .., "docCount": ..}`) for the
    /// plan's aggregation field.
    async fn aggregate(&self, plan: &QueryPlan) -> Result<Vec<Value>>;
    /// Create-only write; an existing id is a conflict.
    async fn put(&self, id: &Id, doc: Value) -> Result<()>;
    /// Upsert write for updates.
    async fn update(&self, id: &Id, doc: Value) -> Result<()>;
    async fn delete(&self, id: &Id) -> Result<()>;
}

/// Structural/link validation delegated to an external service. The resolver
/// only gates on the outcome.
#[async_trait::async_trait]
pub trait SchemaValidator: Send + Sync {
    async fn validate(&self, doc: &Value) -> Result<()>;
}

/// Validator stand-in that accepts every document, for deployments where the
/// external validator is not wired up.
pub struct AcceptAllValidator;

#[async_trait::async_trait]
impl SchemaValidator for AcceptAllValidator {
    async fn validate(&self, _doc: &Value) -> Result<()> {
        Ok(())
    }
}
