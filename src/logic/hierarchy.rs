use chrono::Utc;
use log::debug;

use crate::error::{CatalogueError, Result};
use crate::logic::limits::QueryChecks;
use crate::model::{
    generate_id, Id, Item, ItemType, ParentRef, QueryNode, QueryPlan,
};
use crate::store::traits::{DocumentStore, SchemaValidator};

/// Enforces the item-type hierarchy: parent existence before create,
/// inherited identifiers copied down, and referential integrity on delete.
///
/// Every multi-step resolution is a chain of dependent awaits — the write
/// never starts unless parent resolution and validation both succeeded.
pub struct ItemHierarchyResolver {
    checks: QueryChecks,
}

impl ItemHierarchyResolver {
    pub fn new(checks: QueryChecks) -> ItemHierarchyResolver {
        ItemHierarchyResolver { checks }
    }

    pub fn checks(&self) -> &QueryChecks {
        &self.checks
    }

    /// Single-document lookup by id. The exactly-one-hit invariant is the
    /// caller's to interpret; this returns the raw hit count and document.
    pub async fn lookup_by_id<S: DocumentStore>(
        &self,
        store: &S,
        id: &Id,
    ) -> Result<(u64, Option<Item>)> {
        let plan = QueryPlan::new(QueryNode::term("id.keyword", id.as_str()), "idLookup_");
        let hits = store.search(&plan).await?;
        let item = match hits.docs.into_iter().next() {
            Some(doc) => Some(Item::from_value(doc)?),
            None => None,
        };
        Ok((hits.total, item))
    }

    /// Parent lookup used on create/update: exactly one document must exist
    /// at the referenced id, and it must be of the type the table demands.
    pub async fn parent_object_info<S: DocumentStore>(
        &self,
        store: &S,
        parent_id: &Id,
        parent: ParentRef,
    ) -> Result<Item> {
        let (total, doc) = self.lookup_by_id(store, parent_id).await?;
        if total != 1 {
            return Err(CatalogueError::LinkValidationFailed(
                parent.missing_message().to_string(),
            ));
        }
        let parent_item = doc.ok_or_else(|| {
            CatalogueError::LinkValidationFailed(parent.missing_message().to_string())
        })?;
        let parent_type = parent_item.primary_type()?;
        let type_ok = match parent {
            ParentRef::CosItem => matches!(parent_type, ItemType::Cos | ItemType::Owner),
            ParentRef::ResourceServer => parent_type == ItemType::ResourceServer,
            ParentRef::Provider => parent_type == ItemType::Provider,
        };
        if !type_ok {
            return Err(CatalogueError::LinkValidationFailed(
                parent.missing_message().to_string(),
            ));
        }
        Ok(parent_item)
    }

    /// Classify the item, resolve its governing parent and copy the
    /// inherited identifiers into the document.
    async fn resolve_parentage<S: DocumentStore>(
        &self,
        store: &S,
        item: &mut Item,
    ) -> Result<ItemType> {
        let item_type = item.primary_type()?;
        let Some(parent_kind) = item_type.required_parent() else {
            return Ok(item_type);
        };
        let parent_id = item
            .parent_id(parent_kind)
            .cloned()
            .ok_or_else(|| {
                CatalogueError::InvalidSchema(format!(
                    "{} item is missing its {} reference",
                    item_type.as_str(),
                    parent_kind.field()
                ))
            })?;
        let parent = self.parent_object_info(store, &parent_id, parent_kind).await?;
        match item_type {
            ItemType::ResourceServer => {
                item.cos = Some(parent.id.clone());
            }
            ItemType::Provider => {
                item.resource_server_url = parent.resource_server_url.clone();
                item.cos = parent.cos.clone();
            }
            ItemType::ResourceGroup | ItemType::Resource => {
                item.provider_user_id = parent.provider_user_id.clone();
                item.resource_server_url = parent.resource_server_url.clone();
                item.cos = parent.cos.clone();
            }
            _ => {}
        }
        Ok(item_type)
    }

    /// Create flow: classify → parent lookup → inherit → validate → persist.
    /// A duplicate id is surfaced from the store as a conflict, unretried.
    pub async fn create_item<S, V>(&self, store: &S, validator: &V, mut item: Item) -> Result<Item>
    where
        S: DocumentStore,
        V: SchemaValidator + ?Sized,
    {
        if item.id.is_empty() {
            item.id = generate_id();
        }
        self.checks.check_item_id(&item.id)?;
        let now = Utc::now();
        item.item_created_at = now;
        item.item_updated_at = now;

        let item_type = self.resolve_parentage(store, &mut item).await?;
        let doc = item.to_value()?;
        validator.validate(&doc).await?;
        store.put(&item.id, doc).await?;
        debug!("created {} item {}", item_type.as_str(), item.id);
        Ok(item)
    }

    /// Update flow: the item must already exist; parentage is re-resolved so
    /// inherited fields cannot drift from the current ancestry.
    pub async fn update_item<S, V>(&self, store: &S, validator: &V, mut item: Item) -> Result<Item>
    where
        S: DocumentStore,
        V: SchemaValidator + ?Sized,
    {
        self.checks.check_item_id(&item.id)?;
        let (total, existing) = self.lookup_by_id(store, &item.id).await?;
        if total != 1 {
            return Err(CatalogueError::ItemNotFound(format!(
                "item not found: {}",
                item.id
            )));
        }
        if let Some(existing) = existing {
            item.item_created_at = existing.item_created_at;
        }
        item.item_updated_at = Utc::now();

        let item_type = self.resolve_parentage(store, &mut item).await?;
        let doc = item.to_value()?;
        validator.validate(&doc).await?;
        store.update(&item.id, doc).await?;
        debug!("updated {} item {}", item_type.as_str(), item.id);
        Ok(item)
    }

    pub async fn get_item<S: DocumentStore>(&self, store: &S, id: &Id) -> Result<Item> {
        self.checks.check_item_id(id)?;
        let (total, item) = self.lookup_by_id(store, id).await?;
        match (total, item) {
            (1, Some(item)) => Ok(item),
            _ => Err(CatalogueError::ItemNotFound(format!(
                "item not found: {}",
                id
            ))),
        }
    }

    /// Delete flow: id-shape check → resolve current type → referential
    /// integrity guard → physical delete.
    pub async fn delete_item<S: DocumentStore>(&self, store: &S, id: &Id) -> Result<()> {
        self.checks.check_item_id(id)?;
        let (total, item) = self.lookup_by_id(store, id).await?;
        let item = match (total, item) {
            (1, Some(item)) => item,
            _ => {
                return Err(CatalogueError::ItemNotFound(format!(
                    "item not found: {}",
                    id
                )))
            }
        };
        let item_type = item.primary_type()?;
        if matches!(item_type, ItemType::ResourceGroup | ItemType::Resource) {
            debug!(
                "deleting {} under provider {:?} (server {:?})",
                id, item.provider, item.resource_server_url
            );
        }

        if let Some(guard) = Self::dependent_query(item_type, id) {
            let dependents = store
                .count(&QueryPlan::new(guard, "dependentCheck_"))
                .await?;
            if dependents > 0 {
                return Err(CatalogueError::Conflict(format!(
                    "cannot delete {}: {} dependent item(s) still reference it",
                    id, dependents
                )));
            }
        }
        store.delete(id).await
    }

    /// The clause that finds live dependents of an item, by type. Resource
    /// items are leaves and need no guard.
    fn dependent_query(item_type: ItemType, id: &Id) -> Option<QueryNode> {
        let child_ref = |field: &str| QueryNode::term(format!("{}.keyword", field), id.as_str());
        match item_type {
            ItemType::Cos | ItemType::Owner => Some(QueryNode::Bool {
                must: vec![QueryNode::term("type.keyword", "ResourceServer")],
                filter: Vec::new(),
                should: vec![child_ref("cos"), child_ref("owner")],
            }),
            ItemType::ResourceServer => Some(child_ref("resourceServer")),
            ItemType::Provider => Some(child_ref("provider")),
            ItemType::ResourceGroup => Some(child_ref("resourceGroup")),
            ItemType::Resource => None,
            ItemType::Instance => Some(child_ref("instance")),
        }
    }

    /// Instance namespace creation; the id doubles as the display name.
    pub async fn create_instance<S, V>(&self, store: &S, validator: &V, id: &Id) -> Result<Item>
    where
        S: DocumentStore,
        V: SchemaValidator + ?Sized,
    {
        self.checks.check_non_blank(id, "instance id")?;
        self.checks.check_item_id(id)?;
        let item = Item {
            id: id.clone(),
            types: vec![ItemType::Instance.as_str().to_string()],
            name: Some(id.clone()),
            description: None,
            resource_group: None,
            provider: None,
            resource_server: None,
            cos: None,
            owner: None,
            instance: None,
            provider_user_id: None,
            resource_server_url: None,
            item_created_at: Utc::now(),
            item_updated_at: Utc::now(),
            extra: serde_json::Map::new(),
        };
        let doc = item.to_value()?;
        validator.validate(&doc).await?;
        store.put(&item.id, doc).await?;
        Ok(item)
    }

    /// Instances may only be deleted once no member item references them.
    pub async fn delete_instance<S: DocumentStore>(&self, store: &S, id: &Id) -> Result<()> {
        self.checks.check_non_blank(id, "instance id")?;
        let (total, _) = self.lookup_by_id(store, id).await?;
        if total != 1 {
            return Err(CatalogueError::ItemNotFound(format!(
                "instance not found: {}",
                id
            )));
        }
        let members = store
            .count(&QueryPlan::new(
                QueryNode::term("instance.keyword", id.as_str()),
                "instanceMembers_",
            ))
            .await?;
        if members != 0 {
            return Err(CatalogueError::Conflict(format!(
                "cannot delete instance {}: {} member item(s) exist",
                id, members
            )));
        }
        store.delete(id).await
    }
}

impl Default for ItemHierarchyResolver {
    fn default() -> Self {
        ItemHierarchyResolver::new(QueryChecks::new())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::Item;
    use crate::store::memory::InMemoryStore;
    use crate::store::traits::AcceptAllValidator;
    use serde_json::json;

    pub(crate) const COS_ID: &str = "0f1b4bd9-4b06-4a74-a6a7-0f8a2c1f4c01";
    pub(crate) const RS_ID: &str = "e9a2f1c8-1a34-4cbe-9d3e-0f8a2c1f4c02";
    pub(crate) const PROVIDER_ID: &str = "83995e8c-fa80-4241-93c0-e86a66154eb6";
    pub(crate) const GROUP_ID: &str = "5c0a28ef-7a37-4d3c-b8b4-0f8a2c1f4c04";
    pub(crate) const RESOURCE_ID: &str = "8b95ab80-a3c1-44f3-b0b0-dfc53c7f2b2e";

    pub(crate) fn item_from(value: serde_json::Value) -> Item {
        Item::from_value(value).unwrap()
    }

    /// COS → ResourceServer → Provider → ResourceGroup → Resource, plus the
    /// "pune" instance namespace.
    pub(crate) async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let resolver = ItemHierarchyResolver::default();
        let validator = AcceptAllValidator;

        let cos = item_from(json!({
            "id": COS_ID, "type": ["COS"], "name": "exchange root"
        }));
        resolver.create_item(&store, &validator, cos).await.unwrap();

        let rs = item_from(json!({
            "id": RS_ID, "type": ["ResourceServer"], "name": "rs.example.org",
            "cos": COS_ID, "resourceServerURL": "https://rs.example.org"
        }));
        resolver.create_item(&store, &validator, rs).await.unwrap();

        let provider = item_from(json!({
            "id": PROVIDER_ID, "type": ["Provider"], "name": "city sensing",
            "resourceServer": RS_ID, "providerUserId": "user-42"
        }));
        resolver
            .create_item(&store, &validator, provider)
            .await
            .unwrap();

        let group = item_from(json!({
            "id": GROUP_ID, "type": ["ResourceGroup"], "name": "aqm sensors",
            "provider": PROVIDER_ID, "instance": "pune"
        }));
        resolver
            .create_item(&store, &validator, group)
            .await
            .unwrap();

        let resource = item_from(json!({
            "id": RESOURCE_ID, "type": ["Resource"], "name": "aqm unit 7",
            "provider": PROVIDER_ID, "resourceGroup": GROUP_ID, "instance": "pune"
        }));
        resolver
            .create_item(&store, &validator, resource)
            .await
            .unwrap();

        let instance = item_from(json!({"id": "pune", "type": ["Instance"]}));
        resolver
            .create_item(&store, &validator, instance)
            .await
            .unwrap();

        store
    }

    #[tokio::test]
    async fn create_inherits_ancestor_fields() {
        let store = seeded_store().await;

        let provider = Item::from_value(store.get(PROVIDER_ID).unwrap()).unwrap();
        assert_eq!(
            provider.resource_server_url.as_deref(),
            Some("https://rs.example.org")
        );
        assert_eq!(provider.cos.as_deref(), Some(COS_ID));

        let resource = Item::from_value(store.get(RESOURCE_ID).unwrap()).unwrap();
        assert_eq!(resource.provider_user_id.as_deref(), Some("user-42"));
        assert_eq!(
            resource.resource_server_url.as_deref(),
            Some("https://rs.example.org")
        );
        assert_eq!(resource.cos.as_deref(), Some(COS_ID));
    }

    #[tokio::test]
    async fn provider_with_unresolvable_server_fails_without_write() {
        let store = seeded_store().await;
        let before = store.len();
        let resolver = ItemHierarchyResolver::default();

        let provider = item_from(json!({
            "id": "aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee",
            "type": ["Provider"],
            "resourceServer": "11111111-2222-4333-8444-555555555555"
        }));
        let err = resolver
            .create_item(&store, &AcceptAllValidator, provider)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogueError::LinkValidationFailed(_)));
        assert!(err.to_string().contains("Resource Server not found"));
        assert_eq!(store.len(), before);
    }

    #[tokio::test]
    async fn parent_of_wrong_type_fails_link_validation() {
        let store = seeded_store().await;
        let resolver = ItemHierarchyResolver::default();

        // Declares the COS id where a ResourceServer is required
        let provider = item_from(json!({
            "id": "aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee",
            "type": ["Provider"],
            "resourceServer": COS_ID
        }));
        let err = resolver
            .create_item(&store, &AcceptAllValidator, provider)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogueError::LinkValidationFailed(_)));
    }

    #[tokio::test]
    async fn duplicate_create_is_a_conflict() {
        let store = seeded_store().await;
        let resolver = ItemHierarchyResolver::default();
        let duplicate = item_from(json!({
            "id": RESOURCE_ID, "type": ["Resource"],
            "provider": PROVIDER_ID, "resourceGroup": GROUP_ID
        }));
        let err = resolver
            .create_item(&store, &AcceptAllValidator, duplicate)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogueError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_blocked_while_dependents_exist() {
        let store = seeded_store().await;
        let resolver = ItemHierarchyResolver::default();

        for blocked in [COS_ID, RS_ID, PROVIDER_ID, GROUP_ID] {
            let err = resolver
                .delete_item(&store, &blocked.to_string())
                .await
                .unwrap_err();
            assert!(
                matches!(err, CatalogueError::Conflict(_)),
                "expected conflict deleting {}",
                blocked
            );
        }

        // Leaf-first teardown goes through
        resolver
            .delete_item(&store, &RESOURCE_ID.to_string())
            .await
            .unwrap();
        resolver
            .delete_item(&store, &GROUP_ID.to_string())
            .await
            .unwrap();
        resolver
            .delete_item(&store, &PROVIDER_ID.to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_rejects_malformed_and_missing_ids() {
        let store = seeded_store().await;
        let resolver = ItemHierarchyResolver::default();

        let err = resolver
            .delete_item(&store, &"not a valid id!".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidUuid(_)));

        let err = resolver
            .delete_item(&store, &"aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogueError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn instance_delete_requires_zero_members() {
        let store = seeded_store().await;
        let resolver = ItemHierarchyResolver::default();

        let err = resolver
            .delete_instance(&store, &"pune".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogueError::Conflict(_)));

        // Remove the members, then the namespace can go
        resolver
            .delete_item(&store, &RESOURCE_ID.to_string())
            .await
            .unwrap();
        resolver
            .delete_item(&store, &GROUP_ID.to_string())
            .await
            .unwrap();
        resolver
            .delete_instance(&store, &"pune".to_string())
            .await
            .unwrap();
    }
}
