//! Config-store operations: reading, writing, and validating the
//! configuration objects the core holds for its components.

use reqwest::Method;

use corax_core::{ConfigValidation, JsonValue, Kind, Model};

use crate::client::{CoraxClient, JsonStream, Result};

impl CoraxClient {
    /// Stream the ids of all config objects.
    pub async fn configs(&self) -> Result<JsonStream> {
        let req = self.request(Method::GET, "/configs")?;
        self.stream_request(req).await
    }

    /// A single config object.
    pub async fn config(&self, config_id: &str) -> Result<JsonValue> {
        self.get_json(&format!("/config/{config_id}")).await
    }

    /// Replace a config object; validation can be bypassed.
    pub async fn put_config(
        &self,
        config_id: &str,
        value: &JsonValue,
        validate: bool,
    ) -> Result<JsonValue> {
        let req = self
            .request(Method::PUT, &format!("/config/{config_id}"))?
            .query(&[("validate", if validate { "true" } else { "false" })])
            .json(value);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    /// Apply a partial update to a config object.
    pub async fn patch_config(&self, config_id: &str, value: &JsonValue) -> Result<JsonValue> {
        let req = self
            .request(Method::PATCH, &format!("/config/{config_id}"))?
            .json(value);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_config(&self, config_id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/config/{config_id}"))?)
            .await?;
        Ok(())
    }

    /// The model describing valid config structures.
    pub async fn configs_model(&self) -> Result<Model> {
        self.get_json("/configs/model").await
    }

    pub async fn update_configs_model(&self, update: &[Kind]) -> Result<Model> {
        let req = self.request(Method::PATCH, "/configs/model")?.json(update);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    /// Validation settings of a config object.
    pub async fn config_validation(&self, config_id: &str) -> Result<ConfigValidation> {
        self.get_json(&format!("/config/{config_id}/validation")).await
    }

    pub async fn put_config_validation(
        &self,
        validation: &ConfigValidation,
    ) -> Result<ConfigValidation> {
        let req = self
            .request(Method::PUT, &format!("/config/{}/validation", validation.id))?
            .json(validation);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }
}
