//! HTTP client for a local Ollama server: answer generation and query
//! embeddings.

use async_trait::async_trait;
use regula_core::config::ServiceConfig;
use regula_core::{AnswerGenerator, ExternalError, QueryEmbedder};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const GENERATION_SERVICE: &str = "generation";
pub const EMBEDDING_SERVICE: &str = "embedding";

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server returned an empty embedding")]
    EmptyEmbedding,
}

impl OllamaError {
    /// Connection failures, timeouts, 5xx and 429 may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_connect() || e.is_timeout() || e.status().is_some_and(transient_status)
            }
            Self::Server { status, .. } => {
                StatusCode::from_u16(*status).is_ok_and(transient_status)
            }
            Self::Json(_) | Self::EmptyEmbedding => false,
        }
    }

    fn into_external(self, service: &'static str) -> ExternalError {
        let transient = self.is_transient();
        ExternalError::failed(service, self.to_string(), transient)
    }
}

fn transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Long-lived Ollama handle. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    generation_model: String,
    embedding_model: String,
}

impl OllamaClient {
    /// `base_url` should be like `http://localhost:11434` (no trailing slash
    /// needed).
    pub fn new(
        base_url: impl Into<String>,
        generation_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            generation_model: generation_model.into(),
            embedding_model: embedding_model.into(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            &config.ollama_url,
            &config.generation_model,
            &config.embedding_model,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Non-streaming completion at temperature 0.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, OllamaError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        info!(
            url = %url,
            model = %self.generation_model,
            prompt_len = prompt.len(),
            "requesting generation"
        );
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OllamaError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)?;
        debug!(answer_len = parsed.response.len(), "generation complete");
        Ok(parsed.response)
    }

    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, OllamaError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };

        debug!(url = %url, model = %self.embedding_model, "requesting embedding");
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OllamaError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let parsed: EmbeddingResponse = serde_json::from_slice(&bytes)?;
        if parsed.embedding.is_empty() {
            return Err(OllamaError::EmptyEmbedding);
        }
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl AnswerGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, ExternalError> {
        self.generate_text(prompt)
            .await
            .map_err(|e| e.into_external(GENERATION_SERVICE))
    }
}

#[async_trait]
impl QueryEmbedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ExternalError> {
        self.embed_text(text)
            .await
            .map_err(|e| e.into_external(EMBEDDING_SERVICE))
    }
}
