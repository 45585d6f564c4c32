//! Search operations against a graph.
//!
//! List, graph, and aggregate searches stream NDJSON; raw and explain
//! return a single document.

use reqwest::Method;

use corax_core::{EstimatedSearchCost, JsonValue};

use crate::client::{CoraxClient, JsonStream, Result};

impl CoraxClient {
    /// Run a search and return the raw query-engine response.
    pub async fn search_raw(&self, graph: &str, search: &str) -> Result<JsonValue> {
        let req = self
            .request(Method::POST, &format!("/graph/{graph}/search/raw"))?
            .body(search.to_string());
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    /// Estimate the cost of a search without running it.
    pub async fn search_explain(&self, graph: &str, search: &str) -> Result<EstimatedSearchCost> {
        let req = self
            .request(Method::POST, &format!("/graph/{graph}/search/explain"))?
            .body(search.to_string());
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    /// Stream all nodes matching a search.
    pub async fn search_list(
        &self,
        graph: &str,
        search: &str,
        section: Option<&str>,
    ) -> Result<JsonStream> {
        self.search_stream(graph, "list", search, section).await
    }

    /// Stream matching nodes plus the edges between them.
    pub async fn search_graph(
        &self,
        graph: &str,
        search: &str,
        section: Option<&str>,
    ) -> Result<JsonStream> {
        self.search_stream(graph, "graph", search, section).await
    }

    /// Stream the results of an aggregation search.
    pub async fn search_aggregate(
        &self,
        graph: &str,
        search: &str,
        section: Option<&str>,
    ) -> Result<JsonStream> {
        self.search_stream(graph, "aggregate", search, section).await
    }

    async fn search_stream(
        &self,
        graph: &str,
        kind: &str,
        search: &str,
        section: Option<&str>,
    ) -> Result<JsonStream> {
        let mut req = self
            .request(Method::POST, &format!("/graph/{graph}/search/{kind}"))?
            .body(search.to_string());
        if let Some(section) = section {
            req = req.query(&[("section", section)]);
        }
        self.stream_request(req).await
    }
}
