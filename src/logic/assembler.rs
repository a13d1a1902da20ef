use serde_json::Value;

use crate::error::CatalogueError;
use crate::model::ResponseEnvelope;
use crate::store::traits::SearchHits;

/// Maps store responses and failure conditions onto the uniform envelope.
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn search(hits: SearchHits) -> ResponseEnvelope {
        ResponseEnvelope::success_with_total(hits.docs, hits.total)
    }

    pub fn count(total: u64) -> ResponseEnvelope {
        ResponseEnvelope::success_with_total(Vec::new(), total)
    }

    pub fn results(results: Vec<Value>) -> ResponseEnvelope {
        ResponseEnvelope::success(results)
    }

    /// Degraded multi-criteria execution: some results, with a note on what
    /// was dropped.
    pub fn partial(hits: SearchHits, detail: impl Into<String>) -> ResponseEnvelope {
        ResponseEnvelope::partial(hits.docs, detail)
    }

    pub fn failure(err: &CatalogueError) -> ResponseEnvelope {
        ResponseEnvelope::failure(err)
    }
}
