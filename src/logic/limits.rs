use regex::Regex;
use serde_json::Value;

use crate::error::{CatalogueError, Result};
use crate::model::common::is_uuid;

pub const MAX_COORDINATE_PRECISION: usize = 6;
pub const MAX_POLYGON_RING_POINTS: usize = 13;
pub const MAX_GEO_DISTANCE_METERS: f64 = 10_000.0;
pub const MAX_TEXT_QUERY_LEN: usize = 100;
pub const MAX_ATTR_PROPERTIES: usize = 4;
pub const MAX_ATTR_VALUES_PER_GROUP: usize = 4;
pub const MAX_FILTER_ATTRS: usize = 10;
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Pure request-limit checks. Holds the compiled patterns so they are built
/// exactly once at startup and shared by reference; no lazy statics.
#[derive(Debug)]
pub struct QueryChecks {
    text_allowed: Regex,
    path_id: Regex,
}

impl Default for QueryChecks {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryChecks {
    pub fn new() -> QueryChecks {
        QueryChecks {
            text_allowed: Regex::new(r"^[A-Za-z0-9 *,.'()+_-]+$").expect("valid regex"),
            path_id: Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*(/[A-Za-z0-9._-]+){0,4}$")
                .expect("valid regex"),
        }
    }

    /// A single coordinate component: finite, at most six decimal digits.
    pub fn check_coordinate(&self, value: &Value) -> Result<f64> {
        let number = value.as_f64().filter(|f| f.is_finite()).ok_or_else(|| {
            CatalogueError::InvalidGeoValue(format!("coordinate is not a finite number: {}", value))
        })?;
        let text = value.to_string();
        if let Some(decimals) = text.split('.').nth(1) {
            let digits = decimals
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .count();
            if digits > MAX_COORDINATE_PRECISION {
                return Err(CatalogueError::InvalidGeoValue(format!(
                    "coordinate precision exceeds {} decimal digits: {}",
                    MAX_COORDINATE_PRECISION, text
                )));
            }
        }
        Ok(number)
    }

    pub fn check_max_distance(&self, distance: f64) -> Result<()> {
        if !distance.is_finite() || distance <= 0.0 {
            return Err(CatalogueError::InvalidGeoValue(format!(
                "maxDistance must be positive: {}",
                distance
            )));
        }
        if distance > MAX_GEO_DISTANCE_METERS {
            return Err(CatalogueError::InvalidGeoValue(format!(
                "maxDistance exceeds {} meters: {}",
                MAX_GEO_DISTANCE_METERS, distance
            )));
        }
        Ok(())
    }

    /// Polygon ring: first point equals last, ring bounded in length.
    pub fn check_polygon_ring(&self, ring: &[[f64; 2]]) -> Result<()> {
        if ring.len() < 4 {
            return Err(CatalogueError::InvalidGeoValue(format!(
                "polygon ring needs at least 4 points, got {}",
                ring.len()
            )));
        }
        if ring.len() > MAX_POLYGON_RING_POINTS {
            return Err(CatalogueError::InvalidGeoValue(format!(
                "polygon ring exceeds {} points: {}",
                MAX_POLYGON_RING_POINTS,
                ring.len()
            )));
        }
        if ring.first() != ring.last() {
            return Err(CatalogueError::InvalidGeoValue(
                "polygon ring is not closed (first point != last point)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_text_query(&self, q: &str) -> Result<()> {
        if q.trim().is_empty() {
            return Err(CatalogueError::InvalidSyntax(
                "text query must not be blank".to_string(),
            ));
        }
        if q.len() > MAX_TEXT_QUERY_LEN {
            return Err(CatalogueError::InvalidParamValue(format!(
                "text query exceeds {} characters",
                MAX_TEXT_QUERY_LEN
            )));
        }
        if !self.text_allowed.is_match(q) {
            return Err(CatalogueError::InvalidParamValue(format!(
                "text query contains disallowed characters: {}",
                q
            )));
        }
        Ok(())
    }

    pub fn check_attribute_arity(
        &self,
        properties: &[String],
        value_groups: &[Vec<String>],
    ) -> Result<()> {
        if properties.is_empty() {
            return Err(CatalogueError::InvalidSyntax(
                "attribute search requires at least one property".to_string(),
            ));
        }
        if properties.len() > MAX_ATTR_PROPERTIES {
            return Err(CatalogueError::InvalidParamValue(format!(
                "attribute search supports at most {} properties, got {}",
                MAX_ATTR_PROPERTIES,
                properties.len()
            )));
        }
        if properties.len() != value_groups.len() {
            return Err(CatalogueError::InvalidParamValue(format!(
                "property count {} does not match value group count {}",
                properties.len(),
                value_groups.len()
            )));
        }
        for group in value_groups {
            if group.is_empty() || group.len() > MAX_ATTR_VALUES_PER_GROUP {
                return Err(CatalogueError::InvalidParamValue(format!(
                    "each value group must hold 1..={} values, got {}",
                    MAX_ATTR_VALUES_PER_GROUP,
                    group.len()
                )));
            }
        }
        Ok(())
    }

    pub fn check_filter_attrs(&self, attrs: &[String]) -> Result<()> {
        if attrs.is_empty() {
            return Err(CatalogueError::InvalidSyntax(
                "filter requires at least one attribute".to_string(),
            ));
        }
        if attrs.len() > MAX_FILTER_ATTRS {
            return Err(CatalogueError::InvalidParamValue(format!(
                "filter supports at most {} attributes, got {}",
                MAX_FILTER_ATTRS,
                attrs.len()
            )));
        }
        Ok(())
    }

    /// Paging window. Out-of-range values fail; an over-large sum is clamped
    /// silently by shrinking the larger of the two.
    pub fn clamp_pagination(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<(usize, usize)> {
        let limit = limit.unwrap_or(crate::model::QueryPlan::DEFAULT_LIMIT);
        let offset = offset.unwrap_or(0);
        if limit > MAX_RESULT_WINDOW {
            return Err(CatalogueError::InvalidParamValue(format!(
                "limit exceeds {}: {}",
                MAX_RESULT_WINDOW, limit
            )));
        }
        if offset > MAX_RESULT_WINDOW {
            return Err(CatalogueError::InvalidParamValue(format!(
                "offset exceeds {}: {}",
                MAX_RESULT_WINDOW, offset
            )));
        }
        if limit + offset > MAX_RESULT_WINDOW {
            let excess = limit + offset - MAX_RESULT_WINDOW;
            if limit >= offset {
                return Ok((limit - excess, offset));
            }
            return Ok((limit, offset - excess));
        }
        Ok((limit, offset))
    }

    /// Item id shape: plain UUID or slash-separated namespaced path.
    pub fn check_item_id(&self, id: &str) -> Result<()> {
        if is_uuid(id) || self.path_id.is_match(id) {
            return Ok(());
        }
        Err(CatalogueError::InvalidUuid(format!(
            "malformed item id: {}",
            id
        )))
    }

    pub fn check_non_blank(&self, value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(CatalogueError::InvalidSyntax(format!(
                "{} must not be blank",
                field
            )));
        }
        Ok(())
    }
}
