use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CatalogueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    Success,
    PartialContent,
    Fail,
}

/// Uniform result envelope returned by every endpoint. Constructed fresh per
/// call; never reused across branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status: ResponseStatus,
    #[serde(rename = "type")]
    pub urn: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_hits: Option<u64>,
}

impl ResponseEnvelope {
    pub fn success(results: Vec<Value>) -> ResponseEnvelope {
        ResponseEnvelope {
            status: ResponseStatus::Success,
            urn: "urn:dx:cat:Success".to_string(),
            title: "Success".to_string(),
            detail: None,
            results,
            total_hits: None,
        }
    }

    pub fn success_with_total(results: Vec<Value>, total: u64) -> ResponseEnvelope {
        ResponseEnvelope {
            total_hits: Some(total),
            ..ResponseEnvelope::success(results)
        }
    }

    pub fn partial(results: Vec<Value>, detail: impl Into<String>) -> ResponseEnvelope {
        ResponseEnvelope {
            status: ResponseStatus::PartialContent,
            urn: "urn:dx:cat:PartialContent".to_string(),
            title: "Partial Content".to_string(),
            detail: Some(detail.into()),
            results,
            total_hits: None,
        }
    }

    pub fn failure(err: &CatalogueError) -> ResponseEnvelope {
        ResponseEnvelope {
            status: ResponseStatus::Fail,
            urn: err.urn().to_string(),
            title: err.title().to_string(),
            detail: Some(err.to_string()),
            results: Vec::new(),
            total_hits: None,
        }
    }
}
