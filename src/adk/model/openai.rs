// SPDX-License-Identifier: MIT

//! OpenAI Model - chat completions and embeddings

use super::{Embedder, GenerationConfig, Message, Model};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn http_client() -> Result<Client, ModelError> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

fn api_key_from_env() -> Result<String, ModelError> {
    env::var("OPENAI_API_KEY").map_err(|_| ModelError::ApiKeyMissing("OpenAI".to_string()))
}

fn base_url_from_env() -> String {
    env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// Map a non-success response to a `ModelError`
async fn error_from_response(resp: Response) -> ModelError {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return ModelError::RateLimited { retry_after_secs };
    }
    let message = resp.text().await.unwrap_or_default();
    ModelError::Api {
        provider: "OpenAI".to_string(),
        status: status.as_u16(),
        message,
    }
}

/// OpenAI chat model implementation
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new OpenAIModel
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    /// Optionally uses `OPENAI_BASE_URL` for custom endpoints.
    pub fn new(model_name: String) -> Result<Self, ModelError> {
        Self::with_endpoint(api_key_from_env()?, base_url_from_env(), model_name)
    }

    /// Create a client against an explicit endpoint
    pub fn with_endpoint(
        api_key: String,
        base_url: String,
        model_name: String,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            model_name,
            base_url,
        })
    }

    fn request_body(&self, messages: &[Message], config: Option<&GenerationConfig>) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        body
    }

    /// Extract the text of the first choice
    fn parse_response(response: &serde_json::Value) -> Result<String, ModelError> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("No choices in OpenAI response".into()))?;

        choice["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ModelError::InvalidResponse("Choice has no text content".into()))
    }
}

#[async_trait]
impl Model for OpenAIModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(
        &self,
        messages: &[Message],
        config: Option<&GenerationConfig>,
    ) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(messages, config);

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("OpenAI response: {}", resp_json);

        Self::parse_response(&resp_json)
    }
}

/// OpenAI embeddings client
pub struct OpenAIEmbedder {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIEmbedder {
    pub fn new(model_name: String) -> Result<Self, ModelError> {
        Self::with_endpoint(api_key_from_env()?, base_url_from_env(), model_name)
    }

    pub fn with_endpoint(
        api_key: String,
        base_url: String,
        model_name: String,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            model_name,
            base_url,
        })
    }

    fn parse_response(response: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>, ModelError> {
        let data = response["data"]
            .as_array()
            .ok_or_else(|| ModelError::InvalidResponse("No data in embeddings response".into()))?;

        let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
        for (position, item) in data.iter().enumerate() {
            let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
            let vector = item["embedding"]
                .as_array()
                .ok_or_else(|| ModelError::InvalidResponse("Embedding entry has no vector".into()))?
                .iter()
                .map(|v| v.as_f64().unwrap_or_default() as f32)
                .collect();
            indexed.push((index, vector));
        }
        indexed.sort_by_key(|(i, _)| *i);

        if indexed.len() != expected {
            return Err(ModelError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                expected,
                indexed.len()
            )));
        }

        Ok(indexed.into_iter().map(|(_, v)| v).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model_name,
            "input": texts
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        let resp_json: serde_json::Value = resp.json().await?;
        Self::parse_response(&resp_json, texts.len())
    }
}
