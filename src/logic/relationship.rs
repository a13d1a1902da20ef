use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::error::{CatalogueError, Result};
use crate::logic::hierarchy::ItemHierarchyResolver;
use crate::model::{Id, Item, ItemType, QueryNode, QueryPlan};
use crate::store::traits::{DocumentStore, SearchHits};

/// Requested traversal target in a relationship query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKey {
    Resource,
    ResourceGroup,
    Provider,
    ResourceServer,
    Cos,
    Type,
}

impl RelationshipKey {
    pub fn from_str(s: &str) -> Option<RelationshipKey> {
        match s {
            "resource" => Some(RelationshipKey::Resource),
            "resourceGroup" => Some(RelationshipKey::ResourceGroup),
            "provider" => Some(RelationshipKey::Provider),
            "resourceServer" => Some(RelationshipKey::ResourceServer),
            "cos" => Some(RelationshipKey::Cos),
            "type" => Some(RelationshipKey::Type),
            _ => None,
        }
    }
}

/// Field roots `relSearch` accepts; anything else compiles to no plan.
const REL_SEARCH_ROOTS: [&str; 5] = [
    "resource",
    "resourceGroup",
    "provider",
    "resourceServer",
    "cos",
];

/// Direction-aware walker over the item hierarchy. Each call is a bounded
/// chain of at most three sequential lookups (self, parent, grandparent) and
/// terminates on a definitive answer or `ItemNotFound`.
pub struct RelationshipTraversalEngine {
    resolver: Arc<ItemHierarchyResolver>,
}

impl RelationshipTraversalEngine {
    pub fn new(resolver: Arc<ItemHierarchyResolver>) -> RelationshipTraversalEngine {
        RelationshipTraversalEngine { resolver }
    }

    pub async fn list_relationship<S: DocumentStore>(
        &self,
        store: &S,
        id: &Id,
        key: RelationshipKey,
    ) -> Result<Vec<Value>> {
        self.resolver.checks().check_non_blank(id, "id")?;
        let (total, origin) = self.resolver.lookup_by_id(store, id).await?;
        let origin = match (total, origin) {
            (t, Some(origin)) if t >= 1 => origin,
            _ => {
                return Err(CatalogueError::ItemNotFound(format!(
                    "item not found: {}",
                    id
                )))
            }
        };
        let origin_type = origin.primary_type()?;
        debug!(
            "relationship {:?} from {} ({})",
            key,
            id,
            origin_type.as_str()
        );

        match key {
            RelationshipKey::Type => Ok(origin
                .types
                .iter()
                .map(|t| Value::String(t.clone()))
                .collect()),
            RelationshipKey::Resource => self.to_resources(store, &origin, origin_type).await,
            RelationshipKey::ResourceGroup => {
                self.to_resource_group(store, &origin, origin_type).await
            }
            RelationshipKey::Provider => self.to_provider(store, &origin, origin_type).await,
            RelationshipKey::ResourceServer => {
                self.to_resource_server(store, &origin, origin_type).await
            }
            RelationshipKey::Cos => self.to_cos(store, &origin, origin_type).await,
        }
    }

    /// Reverse lookup over a dotted relationship field path. An unknown root
    /// segment yields no plan at all — a deliberate no-op, not an error.
    pub async fn rel_search<S: DocumentStore>(
        &self,
        store: &S,
        relationship: &str,
        values: Vec<String>,
    ) -> Result<Option<SearchHits>> {
        let Some(plan) = Self::rel_search_plan(relationship, values)? else {
            return Ok(None);
        };
        let hits = store.search(&plan).await?;
        Ok(Some(hits))
    }

    pub fn rel_search_plan(
        relationship: &str,
        values: Vec<String>,
    ) -> Result<Option<QueryPlan>> {
        let root = relationship.split('.').next().unwrap_or_default();
        if !REL_SEARCH_ROOTS.contains(&root) {
            debug!("relSearch: unknown relationship root {:?}, no plan", root);
            return Ok(None);
        }
        if values.is_empty() {
            return Err(CatalogueError::InvalidSyntax(
                "relSearch requires at least one value".to_string(),
            ));
        }
        let query = QueryNode::terms(
            format!("{}.keyword", relationship),
            values.into_iter().map(Value::String).collect(),
        );
        Ok(Some(QueryPlan::new(query, "relationshipSearch_")))
    }

    /// One further single-document hop; the exactly-one-hit invariant holds
    /// for every ancestor fetch.
    async fn hop<S: DocumentStore>(
        &self,
        store: &S,
        id: Option<&Id>,
        missing: &str,
    ) -> Result<Item> {
        let id = id.ok_or_else(|| CatalogueError::ItemNotFound(missing.to_string()))?;
        let (total, item) = self.resolver.lookup_by_id(store, id).await?;
        match (total, item) {
            (1, Some(item)) => Ok(item),
            _ => Err(CatalogueError::ItemNotFound(missing.to_string())),
        }
    }

    async fn children<S: DocumentStore>(
        &self,
        store: &S,
        child_type: ItemType,
        parent_field: &str,
        parent_id: &Id,
    ) -> Result<Vec<Value>> {
        let query = QueryNode::must(vec![
            QueryNode::term("type.keyword", child_type.as_str()),
            QueryNode::term(format!("{}.keyword", parent_field), parent_id.as_str()),
        ]);
        let hits = store
            .search(&QueryPlan::new(query, "relationshipSearch_"))
            .await?;
        Ok(hits.docs)
    }

    async fn to_resources<S: DocumentStore>(
        &self,
        store: &S,
        origin: &Item,
        origin_type: ItemType,
    ) -> Result<Vec<Value>> {
        match origin_type {
            ItemType::Resource => Ok(vec![origin.to_value()?]),
            ItemType::ResourceGroup => {
                self.children(store, ItemType::Resource, "resourceGroup", &origin.id)
                    .await
            }
            ItemType::Provider => {
                self.children(store, ItemType::Resource, "provider", &origin.id)
                    .await
            }
            _ => Err(unsupported(origin_type, "resource")),
        }
    }

    async fn to_resource_group<S: DocumentStore>(
        &self,
        store: &S,
        origin: &Item,
        origin_type: ItemType,
    ) -> Result<Vec<Value>> {
        match origin_type {
            // A resource's group is one hop up
            ItemType::Resource => {
                let group = self
                    .hop(store, origin.resource_group.as_ref(), "resource group not found")
                    .await?;
                Ok(vec![group.to_value()?])
            }
            // A group resolves to its own document
            ItemType::ResourceGroup => Ok(vec![origin.to_value()?]),
            ItemType::Provider => {
                self.children(store, ItemType::ResourceGroup, "provider", &origin.id)
                    .await
            }
            _ => Err(unsupported(origin_type, "resourceGroup")),
        }
    }

    async fn to_provider<S: DocumentStore>(
        &self,
        store: &S,
        origin: &Item,
        origin_type: ItemType,
    ) -> Result<Vec<Value>> {
        match origin_type {
            ItemType::Resource | ItemType::ResourceGroup => {
                let provider = self
                    .hop(store, origin.provider.as_ref(), "provider not found")
                    .await?;
                Ok(vec![provider.to_value()?])
            }
            ItemType::Provider => Ok(vec![origin.to_value()?]),
            ItemType::ResourceServer => {
                self.children(store, ItemType::Provider, "resourceServer", &origin.id)
                    .await
            }
            _ => Err(unsupported(origin_type, "provider")),
        }
    }

    async fn to_resource_server<S: DocumentStore>(
        &self,
        store: &S,
        origin: &Item,
        origin_type: ItemType,
    ) -> Result<Vec<Value>> {
        match origin_type {
            // Walk through the provider: self -> provider -> server
            ItemType::Resource | ItemType::ResourceGroup => {
                let provider = self
                    .hop(store, origin.provider.as_ref(), "provider not found")
                    .await?;
                let server = self
                    .hop(
                        store,
                        provider.resource_server.as_ref(),
                        "resource server not found",
                    )
                    .await?;
                Ok(vec![server.to_value()?])
            }
            ItemType::Provider => {
                let server = self
                    .hop(
                        store,
                        origin.resource_server.as_ref(),
                        "resource server not found",
                    )
                    .await?;
                Ok(vec![server.to_value()?])
            }
            ItemType::ResourceServer => Ok(vec![origin.to_value()?]),
            ItemType::Cos | ItemType::Owner => {
                self.children(store, ItemType::ResourceServer, "cos", &origin.id)
                    .await
            }
            _ => Err(unsupported(origin_type, "resourceServer")),
        }
    }

    async fn to_cos<S: DocumentStore>(
        &self,
        store: &S,
        origin: &Item,
        origin_type: ItemType,
    ) -> Result<Vec<Value>> {
        match origin_type {
            ItemType::Cos => Ok(vec![origin.to_value()?]),
            _ => {
                let cos = self
                    .hop(store, origin.cos.as_ref(), "cos ancestor not found")
                    .await?;
                Ok(vec![cos.to_value()?])
            }
        }
    }
}

fn unsupported(origin_type: ItemType, key: &str) -> CatalogueError {
    CatalogueError::InvalidSyntax(format!(
        "relationship {} is not defined for a {} item",
        key,
        origin_type.as_str()
    ))
}
