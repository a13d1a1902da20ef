use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::GeoRelation;

/// Backend-agnostic query tree. Externally tagged so the serialized form
/// reads like the engine's own clause vocabulary:
/// `{"bool": {"must": [...], "filter": [...]}}`, `{"term": {...}}` etc.
/// A non-empty `should` list requires at least one of its clauses to match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryNode {
    Bool {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        must: Vec<QueryNode>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        filter: Vec<QueryNode>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        should: Vec<QueryNode>,
    },
    Term {
        field: String,
        value: Value,
    },
    Terms {
        field: String,
        values: Vec<Value>,
    },
    QueryString {
        query: String,
    },
    GeoShape {
        field: String,
        relation: GeoRelation,
        shape: GeoShape,
    },
    MatchAll,
}

impl QueryNode {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> QueryNode {
        QueryNode::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms(field: impl Into<String>, values: Vec<Value>) -> QueryNode {
        QueryNode::Terms {
            field: field.into(),
            values,
        }
    }

    pub fn must(clauses: Vec<QueryNode>) -> QueryNode {
        QueryNode::Bool {
            must: clauses,
            filter: Vec::new(),
            should: Vec::new(),
        }
    }

    pub fn should(clauses: Vec<QueryNode>) -> QueryNode {
        QueryNode::Bool {
            must: Vec::new(),
            filter: Vec::new(),
            should: clauses,
        }
    }
}

/// Shape operand of a geo clause. The `type` discriminator serializes to the
/// same literal the request used for the geometry name, which is what the
/// backing engine keys its shape parsing on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoShape {
    Point {
        coordinates: [f64; 2],
        /// Search radius, meters with unit suffix (e.g. "500m").
        radius: String,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    #[serde(rename = "bbox")]
    Bbox {
        coordinates: Vec<[f64; 2]>,
    },
}

/// Terms aggregation over one keyword field (distinct values + counts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub field: String,
    pub size: usize,
}

/// Compiled plan: one query tree plus paging, optional projection and the
/// composite mode tag. Consumed exactly once by the store gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub query: QueryNode,
    pub limit: usize,
    pub offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
    pub mode_tag: String,
}

impl QueryPlan {
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn new(query: QueryNode, mode_tag: impl Into<String>) -> QueryPlan {
        QueryPlan {
            query,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
            source_fields: None,
            aggregation: None,
            mode_tag: mode_tag.into(),
        }
    }
}
