use serde_json::Value;

use crate::error::{CatalogueError, Result};
use crate::logic::limits::QueryChecks;
use crate::model::{GeoShape, GeoSpec, GeometryType, QueryNode};

/// Builds the geo clause of a query plan from a geometry descriptor.
pub struct GeoShapeBuilder<'a> {
    checks: &'a QueryChecks,
}

impl<'a> GeoShapeBuilder<'a> {
    pub fn new(checks: &'a QueryChecks) -> GeoShapeBuilder<'a> {
        GeoShapeBuilder { checks }
    }

    pub fn build(&self, spec: &GeoSpec) -> Result<QueryNode> {
        self.checks.check_non_blank(&spec.property, "geoproperty")?;
        let shape = match spec.geometry {
            GeometryType::Point => self.point(spec)?,
            GeometryType::Polygon => self.polygon(&spec.coordinates)?,
            GeometryType::LineString => self.line_string(&spec.coordinates)?,
            GeometryType::Bbox => self.bbox(&spec.coordinates)?,
        };
        Ok(QueryNode::GeoShape {
            field: spec.property.clone(),
            relation: spec.relation,
            shape,
        })
    }

    fn point(&self, spec: &GeoSpec) -> Result<GeoShape> {
        let center = self.pair(&spec.coordinates)?;
        let distance = spec.max_distance.ok_or_else(|| {
            CatalogueError::InvalidGeoValue(
                "Point geometry requires maxDistance".to_string(),
            )
        })?;
        self.checks.check_max_distance(distance)?;
        Ok(GeoShape::Point {
            coordinates: center,
            radius: format!("{}m", distance),
        })
    }

    fn polygon(&self, coordinates: &Value) -> Result<GeoShape> {
        let rings = coordinates.as_array().ok_or_else(|| {
            CatalogueError::InvalidGeoValue(
                "Polygon coordinates must be an array of rings".to_string(),
            )
        })?;
        if rings.is_empty() {
            return Err(CatalogueError::InvalidGeoValue(
                "Polygon needs at least one ring".to_string(),
            ));
        }
        let mut parsed = Vec::with_capacity(rings.len());
        for ring in rings {
            let points = self.pair_list(ring)?;
            self.checks.check_polygon_ring(&points)?;
            parsed.push(points);
        }
        Ok(GeoShape::Polygon {
            coordinates: parsed,
        })
    }

    fn line_string(&self, coordinates: &Value) -> Result<GeoShape> {
        let points = self.pair_list(coordinates)?;
        if points.len() < 2 {
            return Err(CatalogueError::InvalidGeoValue(format!(
                "LineString needs at least 2 points, got {}",
                points.len()
            )));
        }
        Ok(GeoShape::LineString {
            coordinates: points,
        })
    }

    fn bbox(&self, coordinates: &Value) -> Result<GeoShape> {
        let corners = self.pair_list(coordinates)?;
        if corners.len() != 2 {
            return Err(CatalogueError::InvalidGeoValue(format!(
                "bbox needs exactly 2 corner points, got {}",
                corners.len()
            )));
        }
        Ok(GeoShape::Bbox {
            coordinates: corners,
        })
    }

    fn pair(&self, value: &Value) -> Result<[f64; 2]> {
        let parts = value.as_array().filter(|a| a.len() == 2).ok_or_else(|| {
            CatalogueError::InvalidGeoValue(format!(
                "expected a [longitude, latitude] pair, got {}",
                value
            ))
        })?;
        Ok([
            self.checks.check_coordinate(&parts[0])?,
            self.checks.check_coordinate(&parts[1])?,
        ])
    }

    fn pair_list(&self, value: &Value) -> Result<Vec<[f64; 2]>> {
        let entries = value.as_array().ok_or_else(|| {
            CatalogueError::InvalidGeoValue(format!(
                "expected an array of coordinate pairs, got {}",
                value
            ))
        })?;
        entries.iter().map(|entry| self.pair(entry)).collect()
    }
}
