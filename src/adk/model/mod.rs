// SPDX-License-Identifier: MIT

//! Model module - generation and embedding capabilities
//!
//! This module provides the `Model` and `Embedder` traits the workflows call
//! through, plus shared message types. Implementations live in submodules:
//! - [anthropic] - Anthropic's Claude API
//! - [openai] - OpenAI chat completions and embeddings
//! - [hashing] - offline feature-hashing embedder

pub mod anthropic;
pub mod hashing;
pub mod openai;

use crate::adk::error::ModelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

/// Speaker of a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message sent to the generation capability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generation capability: prompt in, text out
#[async_trait]
pub trait Model: Send + Sync {
    /// Model identifier, for logs
    fn name(&self) -> &str;

    /// Generate a single text completion for the given conversation
    async fn generate(
        &self,
        messages: &[Message],
        config: Option<&GenerationConfig>,
    ) -> Result<String, ModelError>;
}

/// Embedding capability used by similarity indexes
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each text into a vector; output order matches input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError>;
}

/// Supported generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
}

impl Provider {
    /// Infer the provider from a model name (`gpt*`/`o1*`/`o3*` -> OpenAI, `claude*` -> Anthropic)
    pub fn infer(model_name: &str) -> Option<Self> {
        let name = model_name.to_ascii_lowercase();
        if name.starts_with("gpt") || name.starts_with("o1") || name.starts_with("o3") {
            Some(Provider::OpenAI)
        } else if name.starts_with("claude") {
            Some(Provider::Anthropic)
        } else {
            None
        }
    }
}

impl FromStr for Provider {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(ModelError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "OpenAI"),
            Provider::Anthropic => write!(f, "Anthropic"),
        }
    }
}

/// Build a model client for the given provider
pub fn create_model(provider: Provider, model_name: &str) -> Result<Arc<dyn Model>, ModelError> {
    log::info!("Using provider: {} with model: {}", provider, model_name);
    let model: Arc<dyn Model> = match provider {
        Provider::OpenAI => Arc::new(openai::OpenAIModel::new(model_name.to_string())?),
        Provider::Anthropic => Arc::new(anthropic::AnthropicModel::new(model_name.to_string())?),
    };
    Ok(model)
}
