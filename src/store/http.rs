use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CatalogueError, Result};
use crate::model::{Id, QueryPlan};
use crate::store::traits::{DocumentStore, SearchHits};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    #[serde(default)]
    total_hits: u64,
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateBody {
    #[serde(default)]
    buckets: Vec<Value>,
}

/// REST client for the backing document engine. One attempt per call, no
/// internal retry; engine failures carry the response body as the cause.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> RestStore {
        RestStore {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            index: index.into(),
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.index,
            suffix
        )
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            404 => Err(CatalogueError::ItemNotFound(body)),
            409 => Err(CatalogueError::Conflict(body)),
            _ => Err(CatalogueError::Internal(anyhow::anyhow!(
                "engine returned {}: {}",
                status,
                body
            ))),
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for RestStore {
    async fn search(&self, plan: &QueryPlan) -> Result<SearchHits> {
        let response = self
            .client
            .post(self.url("_search"))
            .json(plan)
            .send()
            .await
            .context("engine search call failed")?;
        let body: SearchBody = self
            .check(response)
            .await?
            .json()
            .await
            .context("malformed engine search response")?;
        Ok(SearchHits {
            total: body.total_hits,
            docs: body.results,
        })
    }

    async fn count(&self, plan: &QueryPlan) -> Result<u64> {
        let response = self
            .client
            .post(self.url("_count"))
            .json(plan)
            .send()
            .await
            .context("engine count call failed")?;
        let body: SearchBody = self
            .check(response)
            .await?
            .json()
            .await
            .context("malformed engine count response")?;
        Ok(body.total_hits)
    }

    async fn aggregate(&self, plan: &QueryPlan) -> Result<Vec<Value>> {
        let response = self
            .client
            .post(self.url("_aggregate"))
            .json(plan)
            .send()
            .await
            .context("engine aggregate call failed")?;
        let body: AggregateBody = self
            .check(response)
            .await?
            .json()
            .await
            .context("malformed engine aggregate response")?;
        Ok(body.buckets)
    }

    async fn put(&self, id: &Id, doc: Value) -> Result<()> {
        let response = self
            .client
            .put(self.url(&format!("_doc/{}", id)))
            .query(&[("op_type", "create")])
            .json(&doc)
            .send()
            .await
            .context("engine put call failed")?;
        self.check(response).await?;
        Ok(())
    }

    async fn update(&self, id: &Id, doc: Value) -> Result<()> {
        let response = self
            .client
            .put(self.url(&format!("_doc/{}", id)))
            .json(&doc)
            .send()
            .await
            .context("engine update call failed")?;
        self.check(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &Id) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("_doc/{}", id)))
            .send()
            .await
            .context("engine delete call failed")?;
        self.check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_without_double_slash() {
        let store = RestStore::new("http://localhost:9200/", "catalogue");
        assert_eq!(store.url("_search"), "http://localhost:9200/catalogue/_search");
        assert_eq!(
            store.url("_doc/abc"),
            "http://localhost:9200/catalogue/_doc/abc"
        );
    }
}
