use std::collections::HashMap;

use itertools::Itertools;
use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::error::{CatalogueError, Result};
use crate::model::{Id, QueryNode, QueryPlan};
use crate::store::traits::{DocumentStore, SearchHits};

/// In-process document store. Evaluates the non-geo subset of the query
/// tree directly against stored documents; used by tests and as a dev
/// backend. Geo clauses need a spatial index and are not supported here.
#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<HashMap<Id, Value>>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.docs.read().get(id).cloned()
    }

    fn matching_docs(&self, node: &QueryNode) -> Result<Vec<Value>> {
        let docs = self.docs.read();
        let mut matched = Vec::new();
        for doc in docs.values() {
            if evaluate(node, doc)? {
                matched.push(doc.clone());
            }
        }
        // Deterministic ordering for paging
        matched.sort_by(|a, b| doc_id(a).cmp(&doc_id(b)));
        Ok(matched)
    }
}

fn doc_id(doc: &Value) -> String {
    doc.get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Resolve a dotted field path against a document, ignoring the engine's
/// `.keyword` suffix.
fn field_value<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    let path = field.strip_suffix(".keyword").unwrap_or(field);
    let mut current = doc;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn value_matches(candidate: &Value, wanted: &Value) -> bool {
    match candidate {
        Value::Array(entries) => entries.iter().any(|e| e == wanted),
        other => other == wanted,
    }
}

fn any_string_contains(doc: &Value, needle: &str, prefix: bool) -> bool {
    match doc {
        Value::String(s) => {
            let lower = s.to_lowercase();
            if prefix {
                lower
                    .split_whitespace()
                    .any(|word| word.starts_with(needle))
            } else {
                lower.contains(needle)
            }
        }
        Value::Array(entries) => entries.iter().any(|e| any_string_contains(e, needle, prefix)),
        Value::Object(map) => map.values().any(|v| any_string_contains(v, needle, prefix)),
        _ => false,
    }
}

fn evaluate(node: &QueryNode, doc: &Value) -> Result<bool> {
    match node {
        QueryNode::MatchAll => Ok(true),
        QueryNode::Term { field, value } => Ok(field_value(doc, field)
            .map(|candidate| value_matches(candidate, value))
            .unwrap_or(false)),
        QueryNode::Terms { field, values } => Ok(field_value(doc, field)
            .map(|candidate| values.iter().any(|v| value_matches(candidate, v)))
            .unwrap_or(false)),
        QueryNode::QueryString { query } => {
            let trimmed = query.trim().to_lowercase();
            let (needle, prefix) = match trimmed.strip_suffix('*') {
                Some(stem) => (stem.to_string(), true),
                None => (trimmed, false),
            };
            Ok(any_string_contains(doc, &needle, prefix))
        }
        QueryNode::Bool {
            must,
            filter,
            should,
        } => {
            for clause in must.iter().chain(filter.iter()) {
                if !evaluate(clause, doc)? {
                    return Ok(false);
                }
            }
            // Non-empty should lists require at least one match
            if !should.is_empty() {
                for clause in should {
                    if evaluate(clause, doc)? {
                        return Ok(true);
                    }
                }
                return Ok(false);
            }
            Ok(true)
        }
        QueryNode::GeoShape { .. } => Err(CatalogueError::Internal(anyhow::anyhow!(
            "geo queries are not supported by the in-memory store"
        ))),
    }
}

fn project(doc: &Value, fields: &[String]) -> Value {
    let mut out = serde_json::Map::new();
    for field in fields {
        if let Some(value) = doc.get(field) {
            out.insert(field.clone(), value.clone());
        }
    }
    Value::Object(out)
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryStore {
    async fn search(&self, plan: &QueryPlan) -> Result<SearchHits> {
        let matched = self.matching_docs(&plan.query)?;
        let total = matched.len() as u64;
        let docs: Vec<Value> = matched
            .into_iter()
            .skip(plan.offset)
            .take(plan.limit)
            .map(|doc| match &plan.source_fields {
                Some(fields) => project(&doc, fields),
                None => doc,
            })
            .collect();
        Ok(SearchHits { total, docs })
    }

    async fn count(&self, plan: &QueryPlan) -> Result<u64> {
        Ok(self.matching_docs(&plan.query)?.len() as u64)
    }

    async fn aggregate(&self, plan: &QueryPlan) -> Result<Vec<Value>> {
        let aggregation = plan.aggregation.as_ref().ok_or_else(|| {
            CatalogueError::Internal(anyhow::anyhow!("aggregate called without an aggregation"))
        })?;
        let matched = self.matching_docs(&plan.query)?;
        let counts = matched
            .iter()
            .filter_map(|doc| field_value(doc, &aggregation.field))
            .filter_map(Value::as_str)
            .counts();
        let buckets = counts
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
            .take(aggregation.size)
            .map(|(key, count)| json!({"key": key, "docCount": count}))
            .collect();
        Ok(buckets)
    }

    async fn put(&self, id: &Id, doc: Value) -> Result<()> {
        let mut docs = self.docs.write();
        if docs.contains_key(id) {
            return Err(CatalogueError::Conflict(format!(
                "document already exists: {}",
                id
            )));
        }
        docs.insert(id.clone(), doc);
        Ok(())
    }

    async fn update(&self, id: &Id, doc: Value) -> Result<()> {
        self.docs.write().insert(id.clone(), doc);
        Ok(())
    }

    async fn delete(&self, id: &Id) -> Result<()> {
        match self.docs.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(CatalogueError::ItemNotFound(format!(
                "document not found: {}",
                id
            ))),
        }
    }
}
