//! Ollama inference client.

use super::ModelClient;
use crate::error::{OmskrivError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Default Ollama server address.
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Client for a locally hosted Ollama server.
pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

impl OllamaClient {
    /// Create a client for `model` at `host` with a per-request timeout.
    pub fn new(
        host: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            host: host.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Model this client generates with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Combine the processing instruction with the chunk text.
    fn build_prompt(prompt: &str, chunk_text: &str) -> String {
        format!(
            "Processing Instruction:\n{}\n\nApply the above instruction to the following text:\n{}",
            prompt, chunk_text
        )
    }

    /// Query the server version, as a reachability probe.
    pub async fn version(&self) -> Result<String> {
        let url = format!("{}/api/version", self.host);
        let resp: VersionResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| OmskrivError::ModelUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| OmskrivError::ModelUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| OmskrivError::ModelUnavailable(e.to_string()))?;

        Ok(resp.version)
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    #[instrument(skip(self, chunk_text, prompt, cancel), fields(model = %self.model))]
    async fn transform(
        &self,
        chunk_text: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(OmskrivError::Cancelled);
        }

        let url = format!("{}/api/generate", self.host);
        let combined = Self::build_prompt(prompt, chunk_text);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &combined,
            stream: false,
        };

        debug!("Sending {} words to {}", chunk_text.split_whitespace().count(), self.model);

        let call = async {
            let resp = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| OmskrivError::ModelUnavailable(e.to_string()))?
                .error_for_status()
                .map_err(|e| OmskrivError::ModelUnavailable(e.to_string()))?;

            let parsed: GenerateResponse = resp
                .json()
                .await
                .map_err(|e| OmskrivError::ModelUnavailable(e.to_string()))?;

            Ok(parsed.response)
        };

        // Dropping the in-flight request on cancellation aborts the connection.
        tokio::select! {
            _ = cancel.cancelled() => Err(OmskrivError::Cancelled),
            result = call => result,
        }
    }
}
