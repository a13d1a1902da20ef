use serde_json::Value;

use crate::error::Result;
use crate::logic::limits::QueryChecks;
use crate::model::{AttributeSpec, QueryNode, TextSpec};

/// Suffix for exact-match fields in the backing index.
pub const KEYWORD_SUFFIX: &str = ".keyword";

/// One builder per search mode. All of them are pure: they validate their
/// slice of the request and emit a clause for the compiler to merge.
pub struct CriterionBuilders<'a> {
    checks: &'a QueryChecks,
}

impl<'a> CriterionBuilders<'a> {
    pub fn new(checks: &'a QueryChecks) -> CriterionBuilders<'a> {
        CriterionBuilders { checks }
    }

    /// Attribute criterion: per property a disjunction over its value group,
    /// conjoined across properties.
    pub fn attribute(&self, spec: &AttributeSpec) -> Result<QueryNode> {
        self.checks
            .check_attribute_arity(&spec.properties, &spec.value_groups)?;
        let mut per_property = Vec::with_capacity(spec.properties.len());
        for (property, group) in spec.properties.iter().zip(spec.value_groups.iter()) {
            let values: Vec<Value> = group.iter().map(|v| Value::String(v.clone())).collect();
            per_property.push(QueryNode::terms(keyword_field(property), values));
        }
        if per_property.len() == 1 {
            return Ok(per_property.remove(0));
        }
        Ok(QueryNode::must(per_property))
    }

    /// Free-text criterion wrapping `q` in a query-string match.
    pub fn text(&self, spec: &TextSpec) -> Result<QueryNode> {
        self.checks.check_text_query(&spec.q)?;
        Ok(QueryNode::QueryString {
            query: spec.q.clone(),
        })
    }

    /// Exact term criterion over a keyword field, used for relationship
    /// traversal and instance scoping.
    pub fn term(&self, field: &str, value: impl Into<Value>) -> QueryNode {
        QueryNode::term(keyword_field(field), value)
    }

    /// Disjunctive term criterion over a keyword field.
    pub fn terms(&self, field: &str, values: Vec<String>) -> QueryNode {
        QueryNode::terms(
            keyword_field(field),
            values.into_iter().map(Value::String).collect(),
        )
    }

    /// Response projection: a field-selection directive, not a query clause.
    pub fn projection(&self, attrs: &[String]) -> Result<Vec<String>> {
        self.checks.check_filter_attrs(attrs)?;
        Ok(attrs.to_vec())
    }
}

fn keyword_field(field: &str) -> String {
    if field.ends_with(KEYWORD_SUFFIX) {
        field.to_string()
    } else {
        format!("{}{}", field, KEYWORD_SUFFIX)
    }
}
