use itertools::Itertools;

use crate::error::{CatalogueError, Result};
use crate::logic::criteria::CriterionBuilders;
use crate::logic::geo::GeoShapeBuilder;
use crate::logic::limits::QueryChecks;
use crate::model::{QueryNode, QueryPlan, SearchMode, SearchSpec};

/// Compiles a normalized search request into exactly one query plan.
///
/// Modes are detected from which sections of the spec are present and are
/// freely combinable; each mode contributes one clause to a single
/// conjunctive plan, so later criteria narrow earlier ones.
pub struct QueryCompiler {
    checks: QueryChecks,
}

impl QueryCompiler {
    pub fn new(checks: QueryChecks) -> QueryCompiler {
        QueryCompiler { checks }
    }

    pub fn checks(&self) -> &QueryChecks {
        &self.checks
    }

    pub fn compile(&self, spec: &SearchSpec) -> Result<QueryPlan> {
        let modes = self.detect_modes(spec)?;
        let builders = CriterionBuilders::new(&self.checks);
        let geo_builder = GeoShapeBuilder::new(&self.checks);

        let mut must = Vec::new();
        let mut filter = Vec::new();
        let mut source_fields = None;

        // Clause order follows mode detection order: attribute, geo, text.
        if let Some(attribute) = &spec.attribute {
            must.push(builders.attribute(attribute)?);
        }
        if let Some(geo) = &spec.geo {
            must.push(geo_builder.build(geo)?);
        }
        if let Some(text) = &spec.text {
            must.push(builders.text(text)?);
        }
        if let Some(attrs) = &spec.filter {
            source_fields = Some(builders.projection(attrs)?);
        }
        if let Some(instance) = &spec.instance {
            self.checks.check_non_blank(instance, "instance")?;
            filter.push(builders.term("instance", instance.as_str()));
        }

        let query = match (must.len(), filter.is_empty()) {
            (1, true) => must.remove(0),
            _ => QueryNode::Bool {
                must,
                filter,
                should: Vec::new(),
            },
        };

        let (limit, offset) = self.checks.clamp_pagination(spec.limit, spec.offset)?;
        let mode_tag: String = modes.iter().map(|m| m.tag()).join("");

        Ok(QueryPlan {
            query,
            limit,
            offset,
            source_fields,
            aggregation: None,
            mode_tag,
        })
    }

    /// Count variant: same plan, but a pure count cannot carry a response
    /// projection.
    pub fn compile_count(&self, spec: &SearchSpec) -> Result<QueryPlan> {
        if spec.filter.is_some() {
            return Err(CatalogueError::InvalidSyntax(
                "count does not support the filter mode".to_string(),
            ));
        }
        self.compile(spec)
    }

    /// Which modes the request carries, in tag order. At least one search
    /// criterion must be present; a bare projection is not a query.
    fn detect_modes(&self, spec: &SearchSpec) -> Result<Vec<SearchMode>> {
        let mut modes = Vec::new();
        if spec.filter.is_some() {
            modes.push(SearchMode::ResponseFilter);
        }
        if spec.attribute.is_some() {
            modes.push(SearchMode::Attribute);
        }
        if spec.geo.is_some() {
            modes.push(SearchMode::Geo);
        }
        if spec.text.is_some() {
            modes.push(SearchMode::Text);
        }
        let has_criterion = modes
            .iter()
            .any(|m| !matches!(m, SearchMode::ResponseFilter));
        if !has_criterion {
            return Err(CatalogueError::InvalidSyntax(
                "no recognizable search mode in request".to_string(),
            ));
        }
        Ok(modes)
    }
}

impl Default for QueryCompiler {
    fn default() -> Self {
        QueryCompiler::new(QueryChecks::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeSpec, GeoRelation, GeoSpec, GeometryType, TextSpec};
    use serde_json::json;

    fn compiler() -> QueryCompiler {
        QueryCompiler::default()
    }

    fn attribute_spec() -> AttributeSpec {
        AttributeSpec {
            properties: vec!["id".to_string()],
            value_groups: vec![vec!["8b95ab80-a3c1-44f3-b0b0-dfc53c7f2b2e".to_string()]],
        }
    }

    fn geo_spec() -> GeoSpec {
        GeoSpec {
            property: "location".to_string(),
            relation: GeoRelation::Near,
            geometry: GeometryType::Point,
            coordinates: json!([73.85, 18.52]),
            max_distance: Some(500.0),
        }
    }

    #[test]
    fn attribute_search_matches_id_keyword() {
        let spec = SearchSpec {
            attribute: Some(attribute_spec()),
            ..SearchSpec::default()
        };
        let plan = compiler().compile(&spec).unwrap();
        assert_eq!(plan.mode_tag, "attributeSearch_");
        assert_eq!(
            plan.query,
            QueryNode::terms(
                "id.keyword",
                vec!["8b95ab80-a3c1-44f3-b0b0-dfc53c7f2b2e".into()]
            )
        );
    }

    #[test]
    fn combined_modes_merge_into_one_conjunction() {
        let spec = SearchSpec {
            attribute: Some(attribute_spec()),
            geo: Some(geo_spec()),
            text: Some(TextSpec {
                q: "air quality".to_string(),
            }),
            filter: Some(vec!["id".to_string(), "name".to_string()]),
            ..SearchSpec::default()
        };
        let plan = compiler().compile(&spec).unwrap();
        assert_eq!(
            plan.mode_tag,
            "responseFilter_attributeSearch_geoSearch_textSearch_"
        );
        match &plan.query {
            QueryNode::Bool { must, .. } => {
                assert_eq!(must.len(), 3);
                assert!(matches!(must[1], QueryNode::GeoShape { .. }));
                assert!(matches!(must[2], QueryNode::QueryString { .. }));
            }
            other => panic!("expected bool clause, got {:?}", other),
        }
        assert_eq!(
            plan.source_fields,
            Some(vec!["id".to_string(), "name".to_string()])
        );
    }

    #[test]
    fn instance_scoping_is_a_filter_clause() {
        let spec = SearchSpec {
            text: Some(TextSpec {
                q: "flood".to_string(),
            }),
            instance: Some("pune".to_string()),
            ..SearchSpec::default()
        };
        let plan = compiler().compile(&spec).unwrap();
        match &plan.query {
            QueryNode::Bool { must, filter, .. } => {
                assert_eq!(must.len(), 1);
                assert_eq!(filter[0], QueryNode::term("instance.keyword", "pune"));
            }
            other => panic!("expected bool clause, got {:?}", other),
        }
    }

    #[test]
    fn no_mode_fails_invalid_syntax() {
        let err = compiler().compile(&SearchSpec::default()).unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidSyntax(_)));

        // A bare projection is not a search criterion
        let spec = SearchSpec {
            filter: Some(vec!["id".to_string()]),
            ..SearchSpec::default()
        };
        let err = compiler().compile(&spec).unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidSyntax(_)));
    }

    #[test]
    fn count_rejects_response_filter() {
        let spec = SearchSpec {
            text: Some(TextSpec {
                q: "flood".to_string(),
            }),
            filter: Some(vec!["id".to_string()]),
            ..SearchSpec::default()
        };
        let err = compiler().compile_count(&spec).unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidSyntax(_)));

        let countable = SearchSpec {
            text: Some(TextSpec {
                q: "flood".to_string(),
            }),
            ..SearchSpec::default()
        };
        assert!(compiler().compile_count(&countable).is_ok());
    }

    #[test]
    fn pagination_clamps_into_plan() {
        let spec = SearchSpec {
            text: Some(TextSpec {
                q: "flood".to_string(),
            }),
            limit: Some(8000),
            offset: Some(4000),
            ..SearchSpec::default()
        };
        let plan = compiler().compile(&spec).unwrap();
        assert_eq!((plan.limit, plan.offset), (6000, 4000));
    }

    #[test]
    fn invalid_geo_fails_before_any_plan() {
        let spec = SearchSpec {
            geo: Some(GeoSpec {
                max_distance: Some(50_000.0),
                ..geo_spec()
            }),
            ..SearchSpec::default()
        };
        let err = compiler().compile(&spec).unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidGeoValue(_)));
    }
}
