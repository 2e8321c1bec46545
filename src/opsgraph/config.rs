//! Application configuration
//!
//! Settings come from an optional YAML file, then environment overrides.
//! Every field has a default so an empty file (or no file) is valid.

use crate::adk::error::OpsGraphError;
use crate::adk::model::hashing::HashingEmbedder;
use crate::adk::model::openai::OpenAIEmbedder;
use crate::adk::model::{create_model, Embedder, Model, Provider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "opsgraph.yaml";

/// Embedding model name selecting the offline embedder
pub const HASHING_EMBEDDER: &str = "hashing";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// `openai` or `anthropic`; inferred from `name` when absent
    pub provider: Option<String>,
    pub name: String,
    pub temperature: f32,
    /// Embedding model, or `hashing` for the offline embedder
    pub embedding: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: None,
            name: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            embedding: "text-embedding-3-small".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub recency_capacity: usize,
    /// Messages from the recency buffer injected into prompts
    pub recency_window: usize,
    pub memory_top_k: usize,
    pub knowledge_top_k: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            recency_capacity: 20,
            recency_window: 3,
            memory_top_k: 2,
            knowledge_top_k: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub max_retries: u32,
    pub max_rejections: u32,
    pub step_limit: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_rejections: 3,
            step_limit: crate::opsgraph::graph::DEFAULT_STEP_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/knowledge_base`
    pub knowledge_base_dir: Option<PathBuf>,
    /// Defaults to `<data_dir>/vector_store`
    pub index_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub model: ModelSettings,
    pub memory: MemorySettings,
    pub workflow: WorkflowSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            knowledge_base_dir: None,
            index_dir: None,
            output_dir: PathBuf::from("outputs"),
            model: ModelSettings::default(),
            memory: MemorySettings::default(),
            workflow: WorkflowSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path` (must exist) or `opsgraph.yaml` if present, then apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self, OpsGraphError> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p).map_err(|e| {
                    OpsGraphError::config(format!("Cannot read config {}: {}", p.display(), e))
                })?;
                Self::parse_yaml(&content)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::parse_yaml(&std::fs::read_to_string(DEFAULT_CONFIG_FILE)?)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn parse_yaml(content: &str) -> Result<Self, OpsGraphError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), OpsGraphError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("MODEL_PROVIDER") {
            self.model.provider = Some(provider);
        }
        if let Some(name) = lookup("MODEL_NAME") {
            self.model.name = name;
        }
        if let Some(dir) = lookup("OPSGRAPH_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("OPSGRAPH_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("OPSGRAPH_MAX_RETRIES") {
            self.workflow.max_retries = raw.trim().parse().map_err(|_| {
                OpsGraphError::config(format!("OPSGRAPH_MAX_RETRIES must be an integer, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    pub fn knowledge_base_dir(&self) -> PathBuf {
        self.knowledge_base_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("knowledge_base"))
    }

    pub fn index_dir(&self) -> PathBuf {
        self.index_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("vector_store"))
    }

    pub fn provider(&self) -> Result<Provider, OpsGraphError> {
        match &self.model.provider {
            Some(p) => Ok(p.parse()?),
            None => Provider::infer(&self.model.name).ok_or_else(|| {
                OpsGraphError::config(format!(
                    "Cannot infer provider for model '{}'; set MODEL_PROVIDER",
                    self.model.name
                ))
            }),
        }
    }

    pub fn create_model(&self) -> Result<Arc<dyn Model>, OpsGraphError> {
        Ok(create_model(self.provider()?, &self.model.name)?)
    }

    pub fn create_embedder(&self) -> Result<Arc<dyn Embedder>, OpsGraphError> {
        if self.model.embedding == HASHING_EMBEDDER {
            log::info!("Using offline hashing embedder");
            return Ok(Arc::new(HashingEmbedder::default()));
        }
        log::info!("Using embedding model: {}", self.model.embedding);
        Ok(Arc::new(OpenAIEmbedder::new(self.model.embedding.clone())?))
    }
}
