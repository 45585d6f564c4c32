//! Graph, node, and schema-model operations.

use reqwest::Method;

use corax_core::{GraphUpdate, JsonValue, Kind, Model};

use crate::client::{ApiError, CoraxClient, Result};

impl CoraxClient {
    // ── Graphs ───────────────────────────────────────────────────

    /// Names of all graphs on this core.
    pub async fn list_graphs(&self) -> Result<Vec<String>> {
        self.get_json("/graph").await
    }

    /// The root node of a graph, or `None` if the graph does not exist.
    pub async fn get_graph(&self, graph: &str) -> Result<Option<JsonValue>> {
        let response = self
            .request(Method::GET, &format!("/graph/{graph}"))?
            .send()
            .await?;
        if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            Ok(None)
        }
    }

    /// Create a graph; returns its root node.
    pub async fn create_graph(&self, graph: &str) -> Result<JsonValue> {
        let response = self
            .send(self.request(Method::POST, &format!("/graph/{graph}"))?)
            .await?;
        Ok(response.json().await?)
    }

    /// Delete a graph. With `truncate`, only the data is removed and
    /// the graph itself stays.
    pub async fn delete_graph(&self, graph: &str, truncate: bool) -> Result<String> {
        let mut req = self.request(Method::DELETE, &format!("/graph/{graph}"))?;
        if truncate {
            req = req.query(&[("truncate", "true")]);
        }
        let response = self.send(req).await?;
        Ok(response.text().await?)
    }

    /// Merge a node/edge update list into a graph.
    pub async fn merge_graph(&self, graph: &str, update: &[JsonValue]) -> Result<GraphUpdate> {
        let req = self
            .request(Method::POST, &format!("/graph/{graph}/merge"))?
            .json(update);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    // ── Batches ──────────────────────────────────────────────────

    /// Add an update to a merge batch; returns the batch id and the
    /// resulting counters.
    pub async fn add_to_batch(
        &self,
        graph: &str,
        update: &[JsonValue],
        batch_id: Option<&str>,
    ) -> Result<(String, GraphUpdate)> {
        let mut req = self
            .request(Method::POST, &format!("/graph/{graph}/batch/merge"))?
            .json(update);
        if let Some(batch_id) = batch_id {
            req = req.query(&[("batch_id", batch_id)]);
        }
        let response = self.send(req).await?;
        let batch_id = response
            .headers()
            .get("BatchId")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidResponse("missing BatchId header".to_string()))?;
        Ok((batch_id, response.json().await?))
    }

    /// Currently open batches of a graph.
    pub async fn list_batches(&self, graph: &str) -> Result<Vec<JsonValue>> {
        self.get_json(&format!("/graph/{graph}/batch")).await
    }

    pub async fn commit_batch(&self, graph: &str, batch_id: &str) -> Result<()> {
        self.send(self.request(Method::POST, &format!("/graph/{graph}/batch/{batch_id}"))?)
            .await?;
        Ok(())
    }

    pub async fn abort_batch(&self, graph: &str, batch_id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/graph/{graph}/batch/{batch_id}"))?)
            .await?;
        Ok(())
    }

    // ── Nodes ────────────────────────────────────────────────────

    /// Create a node under the given parent.
    pub async fn create_node(
        &self,
        graph: &str,
        parent_node_id: &str,
        node_id: &str,
        node: &JsonValue,
    ) -> Result<JsonValue> {
        let req = self
            .request(
                Method::POST,
                &format!("/graph/{graph}/node/{node_id}/under/{parent_node_id}"),
            )?
            .json(node);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    pub async fn get_node(&self, graph: &str, node_id: &str) -> Result<JsonValue> {
        self.get_json(&format!("/graph/{graph}/node/{node_id}")).await
    }

    /// Patch a node, optionally within a single section (`reported`,
    /// `desired`, `metadata`).
    pub async fn patch_node(
        &self,
        graph: &str,
        node_id: &str,
        node: &JsonValue,
        section: Option<&str>,
    ) -> Result<JsonValue> {
        let path = match section {
            Some(section) => format!("/graph/{graph}/node/{node_id}/section/{section}"),
            None => format!("/graph/{graph}/node/{node_id}"),
        };
        let req = self.request(Method::PATCH, &path)?.json(node);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_node(&self, graph: &str, node_id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/graph/{graph}/node/{node_id}"))?)
            .await?;
        Ok(())
    }

    /// Patch many nodes in one call.
    pub async fn patch_nodes(&self, graph: &str, nodes: &[JsonValue]) -> Result<Vec<JsonValue>> {
        let req = self
            .request(Method::PATCH, &format!("/graph/{graph}/nodes"))?
            .json(nodes);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    // ── Schema model ─────────────────────────────────────────────

    /// The data model of the core.
    ///
    /// Older cores return a `{kinds: {fqn: kind}}` object, newer ones
    /// a flat list of kinds; both map to [`Model`].
    pub async fn model(&self) -> Result<Model> {
        let response: JsonValue = self.get_json("/model").await?;
        match response {
            JsonValue::Object(_) => Ok(serde_json::from_value(response)?),
            JsonValue::Array(kinds) => {
                let kinds: Vec<Kind> = serde_json::from_value(JsonValue::Array(kinds))?;
                Ok(Model::from_kinds(kinds))
            }
            other => Err(ApiError::InvalidResponse(format!(
                "cannot map to model: {other}"
            ))),
        }
    }

    /// Update kinds in the data model.
    pub async fn update_model(&self, update: &[Kind]) -> Result<Model> {
        let req = self.request(Method::PATCH, "/model")?.json(update);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }
}
