use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Search modes a single request can combine. Order here fixes the order of
/// segments in the compiled plan's mode tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    ResponseFilter,
    Attribute,
    Geo,
    Text,
}

impl SearchMode {
    pub fn tag(&self) -> &'static str {
        match self {
            SearchMode::ResponseFilter => "responseFilter_",
            SearchMode::Attribute => "attributeSearch_",
            SearchMode::Geo => "geoSearch_",
            SearchMode::Text => "textSearch_",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    Polygon,
    LineString,
    #[serde(rename = "bbox")]
    Bbox,
}

impl GeometryType {
    pub fn from_str(s: &str) -> Option<GeometryType> {
        match s {
            "Point" => Some(GeometryType::Point),
            "Polygon" => Some(GeometryType::Polygon),
            "LineString" => Some(GeometryType::LineString),
            "bbox" => Some(GeometryType::Bbox),
            _ => None,
        }
    }
}

/// Spatial relation requested between the indexed geometry and the query
/// shape. `Near` is only meaningful for Point + maxDistance queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoRelation {
    Near,
    Within,
    Intersects,
    Disjoint,
}

impl GeoRelation {
    pub fn from_str(s: &str) -> Option<GeoRelation> {
        match s {
            "near" => Some(GeoRelation::Near),
            "within" => Some(GeoRelation::Within),
            "intersects" => Some(GeoRelation::Intersects),
            "disjoint" => Some(GeoRelation::Disjoint),
            _ => None,
        }
    }
}

/// Geometry descriptor as decoded from the request. Coordinates stay a raw
/// JSON value here; the shape builder parses them per geometry type.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoSpec {
    pub property: String,
    pub relation: GeoRelation,
    pub geometry: GeometryType,
    pub coordinates: Value,
    pub max_distance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub q: String,
}

/// Attribute criteria: `properties[i]` matches any value in
/// `value_groups[i]`; groups are conjoined across properties.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub properties: Vec<String>,
    pub value_groups: Vec<Vec<String>>,
}

/// One normalized search request. Built once per call, immutable, never
/// persisted. Which modes apply is derived from which sections are present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchSpec {
    pub geo: Option<GeoSpec>,
    pub text: Option<TextSpec>,
    pub attribute: Option<AttributeSpec>,
    /// Response projection attributes, not a query criterion.
    pub filter: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub instance: Option<String>,
}

impl Default for GeoSpec {
    fn default() -> Self {
        GeoSpec {
            property: "location".to_string(),
            relation: GeoRelation::Within,
            geometry: GeometryType::Point,
            coordinates: Value::Null,
            max_distance: None,
        }
    }
}
