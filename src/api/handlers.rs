use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::params::{decode, SearchParams};
use crate::error::{CatalogueError, Result};
use crate::logic::{
    ItemHierarchyResolver, QueryChecks, QueryCompiler, RelationshipKey,
    RelationshipTraversalEngine, ResultAssembler,
};
use crate::model::{Aggregation, Item, QueryNode, QueryPlan, ResponseEnvelope};
use crate::store::traits::{DocumentStore, SchemaValidator};

/// Shared per-process state: the store plus the startup-constructed,
/// immutable core components.
pub struct ApiContext<S> {
    pub store: Arc<S>,
    pub compiler: Arc<QueryCompiler>,
    pub resolver: Arc<ItemHierarchyResolver>,
    pub engine: Arc<RelationshipTraversalEngine>,
    pub validator: Arc<dyn SchemaValidator>,
    pub store_timeout: Duration,
}

impl<S> ApiContext<S> {
    pub fn new(
        store: Arc<S>,
        validator: Arc<dyn SchemaValidator>,
        store_timeout: Duration,
    ) -> ApiContext<S> {
        let resolver = Arc::new(ItemHierarchyResolver::new(QueryChecks::new()));
        ApiContext {
            store,
            compiler: Arc::new(QueryCompiler::new(QueryChecks::new())),
            engine: Arc::new(RelationshipTraversalEngine::new(resolver.clone())),
            resolver,
            validator,
            store_timeout,
        }
    }
}

impl<S> Clone for ApiContext<S> {
    fn clone(&self) -> Self {
        ApiContext {
            store: self.store.clone(),
            compiler: self.compiler.clone(),
            resolver: self.resolver.clone(),
            engine: self.engine.clone(),
            validator: self.validator.clone(),
            store_timeout: self.store_timeout,
        }
    }
}

/// Bounded service-level timeout around store-touching work. An elapsed
/// timer surfaces as a recoverable failure, never a silent drop.
async fn with_timeout<T>(
    duration: Duration,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(duration, work).await {
        Ok(result) => result,
        Err(_) => {
            warn!("store operation timed out after {:?}", duration);
            Err(CatalogueError::Internal(anyhow::anyhow!(
                "store operation timed out after {}s",
                duration.as_secs()
            )))
        }
    }
}

fn respond(result: Result<ResponseEnvelope>) -> (StatusCode, Json<ResponseEnvelope>) {
    respond_created(result, StatusCode::OK)
}

fn respond_created(
    result: Result<ResponseEnvelope>,
    ok_status: StatusCode,
) -> (StatusCode, Json<ResponseEnvelope>) {
    match result {
        Ok(envelope) => (ok_status, Json(envelope)),
        Err(err) => {
            let status = StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ResultAssembler::failure(&err)))
        }
    }
}

fn instance_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("instance")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(String::from)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn search<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        let spec = decode(&params, instance_header(&headers))?;
        let plan = ctx.compiler.compile(&spec)?;
        let hits = with_timeout(ctx.store_timeout, ctx.store.search(&plan)).await?;
        Ok(ResultAssembler::search(hits))
    }
    .await;
    respond(outcome)
}

pub async fn count<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        let spec = decode(&params, instance_header(&headers))?;
        let plan = ctx.compiler.compile_count(&spec)?;
        let total = with_timeout(ctx.store_timeout, ctx.store.count(&plan)).await?;
        Ok(ResultAssembler::count(total))
    }
    .await;
    respond(outcome)
}

pub async fn create_item<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        let item = Item::from_value(body)?;
        let created = with_timeout(
            ctx.store_timeout,
            ctx.resolver
                .create_item(ctx.store.as_ref(), ctx.validator.as_ref(), item),
        )
        .await?;
        Ok(ResultAssembler::results(vec![created.to_value()?]))
    }
    .await;
    respond_created(outcome, StatusCode::CREATED)
}

pub async fn update_item<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        let item = Item::from_value(body)?;
        let updated = with_timeout(
            ctx.store_timeout,
            ctx.resolver
                .update_item(ctx.store.as_ref(), ctx.validator.as_ref(), item),
        )
        .await?;
        Ok(ResultAssembler::results(vec![updated.to_value()?]))
    }
    .await;
    respond(outcome)
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: String,
}

pub async fn get_item<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
    Query(query): Query<IdQuery>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        let item = with_timeout(
            ctx.store_timeout,
            ctx.resolver.get_item(ctx.store.as_ref(), &query.id),
        )
        .await?;
        Ok(ResultAssembler::results(vec![item.to_value()?]))
    }
    .await;
    respond(outcome)
}

pub async fn delete_item<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
    Query(query): Query<IdQuery>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        with_timeout(
            ctx.store_timeout,
            ctx.resolver.delete_item(ctx.store.as_ref(), &query.id),
        )
        .await?;
        Ok(ResultAssembler::results(vec![
            serde_json::json!({"id": query.id}),
        ]))
    }
    .await;
    respond(outcome)
}

pub async fn create_instance<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
    Query(query): Query<IdQuery>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        let created = with_timeout(
            ctx.store_timeout,
            ctx.resolver
                .create_instance(ctx.store.as_ref(), ctx.validator.as_ref(), &query.id),
        )
        .await?;
        Ok(ResultAssembler::results(vec![created.to_value()?]))
    }
    .await;
    respond_created(outcome, StatusCode::CREATED)
}

pub async fn delete_instance<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
    Query(query): Query<IdQuery>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        with_timeout(
            ctx.store_timeout,
            ctx.resolver.delete_instance(ctx.store.as_ref(), &query.id),
        )
        .await?;
        Ok(ResultAssembler::results(vec![
            serde_json::json!({"id": query.id}),
        ]))
    }
    .await;
    respond(outcome)
}

/// Distinct instance namespaces currently in use, with member counts.
pub async fn list_instances<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        let mut plan = QueryPlan::new(QueryNode::MatchAll, "instanceList_");
        plan.aggregation = Some(Aggregation {
            field: "instance".to_string(),
            size: 10_000,
        });
        let buckets = with_timeout(ctx.store_timeout, ctx.store.aggregate(&plan)).await?;
        Ok(ResultAssembler::results(buckets))
    }
    .await;
    respond(outcome)
}

#[derive(Debug, Deserialize)]
pub struct RelationshipQuery {
    pub id: String,
    pub rel: String,
}

pub async fn relationship<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
    Query(query): Query<RelationshipQuery>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        let key = RelationshipKey::from_str(&query.rel).ok_or_else(|| {
            CatalogueError::InvalidSyntax(format!("unknown relationship: {}", query.rel))
        })?;
        let results = with_timeout(
            ctx.store_timeout,
            ctx.engine
                .list_relationship(ctx.store.as_ref(), &query.id, key),
        )
        .await?;
        Ok(ResultAssembler::results(results))
    }
    .await;
    respond(outcome)
}

#[derive(Debug, Deserialize)]
pub struct RelSearchQuery {
    pub relationship: String,
    pub value: String,
}

pub async fn rel_search<S: DocumentStore>(
    State(ctx): State<ApiContext<S>>,
    Query(query): Query<RelSearchQuery>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let outcome = async {
        let values: Vec<String> = serde_json::from_str(&query.value).map_err(|_| {
            CatalogueError::InvalidParamValue(format!(
                "value must be a JSON array of strings: {}",
                query.value
            ))
        })?;
        let hits = with_timeout(
            ctx.store_timeout,
            ctx.engine
                .rel_search(ctx.store.as_ref(), &query.relationship, values),
        )
        .await?;
        // An unsupported relationship path is a no-op, not an error
        Ok(match hits {
            Some(hits) => ResultAssembler::search(hits),
            None => ResultAssembler::results(Vec::new()),
        })
    }
    .await;
    respond(outcome)
}
