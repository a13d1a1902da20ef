use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CatalogueError, Result};
use crate::model::Id;

/// Closed set of catalogue item types. Exactly one of these governs an item
/// (see [`ItemType::classify`]); a document may additionally declare vendor
/// types, which are carried through but never classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Resource,
    ResourceGroup,
    Provider,
    ResourceServer,
    #[serde(rename = "COS")]
    Cos,
    Owner,
    Instance,
}

/// Classification precedence: the first declared type in this order governs
/// the item. Resource before ResourceGroup matters — group documents often
/// repeat the full ancestry in their type array.
const CLASSIFY_ORDER: [ItemType; 7] = [
    ItemType::Resource,
    ItemType::ResourceGroup,
    ItemType::Provider,
    ItemType::ResourceServer,
    ItemType::Cos,
    ItemType::Owner,
    ItemType::Instance,
];

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Resource => "Resource",
            ItemType::ResourceGroup => "ResourceGroup",
            ItemType::Provider => "Provider",
            ItemType::ResourceServer => "ResourceServer",
            ItemType::Cos => "COS",
            ItemType::Owner => "Owner",
            ItemType::Instance => "Instance",
        }
    }

    pub fn from_str(s: &str) -> Option<ItemType> {
        match s {
            "Resource" => Some(ItemType::Resource),
            "ResourceGroup" => Some(ItemType::ResourceGroup),
            "Provider" => Some(ItemType::Provider),
            "ResourceServer" => Some(ItemType::ResourceServer),
            "COS" => Some(ItemType::Cos),
            "Owner" => Some(ItemType::Owner),
            "Instance" => Some(ItemType::Instance),
            _ => None,
        }
    }

    /// Intersect a declared type array with the known enum and pick the
    /// governing type. Empty intersection is an `InvalidSchema` failure.
    pub fn classify(declared: &[String]) -> Result<ItemType> {
        let known: Vec<ItemType> = declared
            .iter()
            .filter_map(|s| ItemType::from_str(s))
            .collect();
        CLASSIFY_ORDER
            .iter()
            .copied()
            .find(|t| known.contains(t))
            .ok_or_else(|| {
                CatalogueError::InvalidSchema(format!(
                    "no known item type in declared set {:?}",
                    declared
                ))
            })
    }

    /// The parent field this type must carry on create, with the item type
    /// expected at the referenced id. `None` for root types.
    pub fn required_parent(&self) -> Option<ParentRef> {
        match self {
            ItemType::Cos | ItemType::Owner | ItemType::Instance => None,
            ItemType::ResourceServer => Some(ParentRef::CosItem),
            ItemType::Provider => Some(ParentRef::ResourceServer),
            ItemType::ResourceGroup | ItemType::Resource => Some(ParentRef::Provider),
        }
    }
}

/// Parent reference kinds from the type table. `CosItem` accepts either a
/// COS or an Owner document at the referenced id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    CosItem,
    ResourceServer,
    Provider,
}

impl ParentRef {
    pub fn field(&self) -> &'static str {
        match self {
            ParentRef::CosItem => "cos",
            ParentRef::ResourceServer => "resourceServer",
            ParentRef::Provider => "provider",
        }
    }

    pub fn missing_message(&self) -> &'static str {
        match self {
            ParentRef::CosItem => "COS or Owner not found",
            ParentRef::ResourceServer => "Resource Server not found",
            ParentRef::Provider => "Provider not found",
        }
    }
}

/// Default audit timestamp for documents indexed before audit fields existed.
fn default_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).unwrap_or_else(Utc::now)
}

/// A catalogue document. Parent refs and inherited fields are optional
/// because which of them apply depends on the governing type; everything the
/// schema does not model explicitly rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Id,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // Parent references
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_server: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cos: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Id>,

    /// Namespace grouping label, references an Instance item's id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    // Fields copied down from ancestors on create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_user_id: Option<String>,
    #[serde(rename = "resourceServerURL", skip_serializing_if = "Option::is_none")]
    pub resource_server_url: Option<String>,

    #[serde(default = "default_timestamp")]
    pub item_created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub item_updated_at: DateTime<Utc>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    /// Governing type per the classification precedence.
    pub fn primary_type(&self) -> Result<ItemType> {
        ItemType::classify(&self.types)
    }

    /// The declared parent id for the given reference kind, if present.
    pub fn parent_id(&self, parent: ParentRef) -> Option<&Id> {
        match parent {
            ParentRef::CosItem => self.cos.as_ref().or(self.owner.as_ref()),
            ParentRef::ResourceServer => self.resource_server.as_ref(),
            ParentRef::Provider => self.provider.as_ref(),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| CatalogueError::Internal(anyhow::anyhow!("item serialization: {}", e)))
    }

    pub fn from_value(value: Value) -> Result<Item> {
        serde_json::from_value(value)
            .map_err(|e| CatalogueError::InvalidSchema(format!("malformed item document: {}", e)))
    }
}
