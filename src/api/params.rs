use serde::Deserialize;
use serde_json::Value;

use crate::error::{CatalogueError, Result};
use crate::model::{
    AttributeSpec, GeoRelation, GeoSpec, GeometryType, SearchSpec, TextSpec,
};

/// Raw search/count query parameters, exactly as the wire contract names
/// them. Array-shaped params (`property`, `value`, `coordinates`, `filter`)
/// arrive as JSON-encoded strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub property: Option<String>,
    pub value: Option<String>,
    pub geoproperty: Option<String>,
    pub georel: Option<String>,
    pub geometry: Option<String>,
    pub coordinates: Option<String>,
    #[serde(rename = "maxDistance")]
    pub max_distance: Option<f64>,
    pub q: Option<String>,
    pub filter: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Decode the wire params into a [`SearchSpec`]. Mode detection order is
/// attribute, then geo, then text; the modes stack rather than exclude each
/// other, and the compiler rejects requests where none is present.
pub fn decode(params: &SearchParams, instance: Option<String>) -> Result<SearchSpec> {
    let mut spec = SearchSpec {
        limit: params.limit,
        offset: params.offset,
        instance,
        ..SearchSpec::default()
    };

    if let (Some(property), Some(value)) = (&params.property, &params.value) {
        spec.attribute = Some(AttributeSpec {
            properties: string_list(property, "property")?,
            value_groups: string_list_groups(value, "value")?,
        });
    }

    let geo_fields = [
        &params.geoproperty,
        &params.georel,
        &params.geometry,
        &params.coordinates,
    ];
    if geo_fields.iter().all(|f| f.is_some()) {
        spec.geo = Some(decode_geo(params)?);
    }

    if let Some(q) = &params.q {
        if !q.trim().is_empty() {
            spec.text = Some(TextSpec { q: q.clone() });
        }
    }

    if let Some(filter) = &params.filter {
        spec.filter = Some(string_list(filter, "filter")?);
    }

    Ok(spec)
}

fn decode_geo(params: &SearchParams) -> Result<GeoSpec> {
    let geometry_raw = params.geometry.as_deref().unwrap_or_default();
    let geometry = GeometryType::from_str(geometry_raw).ok_or_else(|| {
        CatalogueError::InvalidGeoValue(format!("unknown geometry: {}", geometry_raw))
    })?;
    let georel_raw = params.georel.as_deref().unwrap_or_default();
    let relation = GeoRelation::from_str(georel_raw).ok_or_else(|| {
        CatalogueError::InvalidGeoValue(format!("unknown georel: {}", georel_raw))
    })?;
    let coordinates: Value = params
        .coordinates
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| {
            CatalogueError::InvalidGeoValue(format!("malformed coordinates: {}", e))
        })?
        .unwrap_or(Value::Null);
    Ok(GeoSpec {
        property: params.geoproperty.clone().unwrap_or_default(),
        relation,
        geometry,
        coordinates,
        max_distance: params.max_distance,
    })
}

fn string_list(raw: &str, name: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|_| {
        CatalogueError::InvalidParamValue(format!(
            "{} must be a JSON array of strings: {}",
            name, raw
        ))
    })
}

fn string_list_groups(raw: &str, name: &str) -> Result<Vec<Vec<String>>> {
    serde_json::from_str(raw).map_err(|_| {
        CatalogueError::InvalidParamValue(format!(
            "{} must be a JSON array of string arrays: {}",
            name, raw
        ))
    })
}
