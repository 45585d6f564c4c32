//! Execution of core CLI commands over the REST interface.

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Deserialize;

use corax_core::{JsonObject, JsonValue, ParsedCommand, ParsedCommands};

use crate::client::{ApiError, CoraxClient, JsonStream, Result};

/// Result of a CLI command, shaped by the response content type.
pub enum CliOutput {
    /// A single plain-text result.
    Text(String),
    /// A single JSON document.
    Json(JsonValue),
    /// A stream of NDJSON values.
    Stream(JsonStream),
}

impl std::fmt::Debug for CliOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}


#[derive(Deserialize)]
struct EvaluateResponse {
    parsed: Vec<ParsedCommand>,
    #[serde(default)]
    env: JsonObject,
    #[serde(default)]
    execute: Vec<JsonValue>,
}

impl CoraxClient {
    /// Parse a CLI line without executing it; returns the parsed
    /// command chains alongside what the core would execute.
    pub async fn cli_evaluate(
        &self,
        graph: &str,
        command: &str,
    ) -> Result<Vec<(ParsedCommands, Vec<JsonValue>)>> {
        let req = self
            .request(Method::POST, "/cli/evaluate")?
            .query(&[("graph", graph), ("section", "reported")])
            .body(command.to_string());
        let response = self.send(req).await?;
        let evaluated: Vec<EvaluateResponse> = response.json().await?;
        Ok(evaluated
            .into_iter()
            .map(|e| {
                (
                    ParsedCommands {
                        commands: e.parsed,
                        env: e.env,
                    },
                    e.execute,
                )
            })
            .collect())
    }

    /// Execute a CLI command.
    ///
    /// The response shape depends on the command: text, a JSON
    /// document, or an NDJSON stream. Other content types (e.g.
    /// multi-part file responses) are rejected.
    pub async fn cli_execute(
        &self,
        graph: &str,
        command: &str,
        section: Option<&str>,
    ) -> Result<CliOutput> {
        let mut req = self
            .request(Method::POST, "/cli/execute")?
            .query(&[("graph", graph)])
            .header(CONTENT_TYPE, "text/plain")
            .body(command.to_string());
        if let Some(section) = section {
            req = req.query(&[("section", section)]);
        }
        let response = self.send(req).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_default();
        match content_type.as_str() {
            "text/plain" => Ok(CliOutput::Text(response.text().await?)),
            "application/json" => Ok(CliOutput::Json(response.json().await?)),
            "application/x-ndjson" => Ok(CliOutput::Stream(crate::client::ndjson_stream(response))),
            other => Err(ApiError::InvalidResponse(format!(
                "unsupported content type: {other}"
            ))),
        }
    }

    /// Information about the CLI: available commands and aliases.
    pub async fn cli_info(&self) -> Result<JsonValue> {
        self.get_json("/cli/info").await
    }
}
