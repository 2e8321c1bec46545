// SPDX-License-Identifier: MIT

//! Session-scoped collaborators shared by every node of a workflow

use crate::adk::error::ModelError;
use crate::adk::model::{GenerationConfig, Message, Model};
use crate::opsgraph::approval::Operator;
use crate::opsgraph::config::AppConfig;
use crate::opsgraph::knowledge::KnowledgeBase;
use crate::opsgraph::memory::{ContextBuilder, PromptContext, RecencyBuffer, SemanticStore};
use crate::opsgraph::sink::ArtifactSink;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tunables read by workflow nodes
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub recency_window: usize,
    pub memory_top_k: usize,
    pub knowledge_top_k: usize,
    pub max_retries: u32,
    pub max_rejections: u32,
    pub step_limit: usize,
    pub temperature: f32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RunSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            recency_window: config.memory.recency_window,
            memory_top_k: config.memory.memory_top_k,
            knowledge_top_k: config.memory.knowledge_top_k,
            max_retries: config.workflow.max_retries,
            max_rejections: config.workflow.max_rejections,
            step_limit: config.workflow.step_limit,
            temperature: config.model.temperature,
        }
    }
}

pub struct ExecutionContext {
    pub model: Arc<dyn Model>,
    pub recency: Mutex<RecencyBuffer>,
    pub memory: SemanticStore,
    pub knowledge: Option<KnowledgeBase>,
    pub sink: Arc<dyn ArtifactSink>,
    pub operator: Arc<dyn Operator>,
    pub settings: RunSettings,
}

impl ExecutionContext {
    pub fn new(
        model: Arc<dyn Model>,
        memory: SemanticStore,
        sink: Arc<dyn ArtifactSink>,
        operator: Arc<dyn Operator>,
    ) -> Self {
        Self {
            model,
            recency: Mutex::new(RecencyBuffer::default()),
            memory,
            knowledge: None,
            sink,
            operator,
            settings: RunSettings::default(),
        }
    }

    pub fn with_knowledge(mut self, knowledge: KnowledgeBase) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_recency_capacity(mut self, capacity: usize) -> Self {
        self.recency = Mutex::new(RecencyBuffer::new(capacity));
        self
    }

    /// One system + user exchange with the configured temperature
    pub async fn generate(&self, system: &str, user: &str) -> Result<String, ModelError> {
        let messages = [Message::system(system), Message::user(user)];
        let config = GenerationConfig {
            temperature: Some(self.settings.temperature),
            ..Default::default()
        };
        log::debug!("Calling model {} ({} chars of prompt)", self.model.name(), user.len());
        self.model.generate(&messages, Some(&config)).await
    }

    /// Single user prompt, no system message
    pub async fn ask(&self, prompt: &str) -> Result<String, ModelError> {
        let config = GenerationConfig {
            temperature: Some(self.settings.temperature),
            ..Default::default()
        };
        self.model.generate(&[Message::user(prompt)], Some(&config)).await
    }

    pub async fn remember(&self, role: &str, content: &str) {
        self.recency.lock().await.append(role, content);
    }

    /// Gather all context tiers for a generation step
    pub async fn prompt_context(
        &self,
        memory_query: &str,
        knowledge_query: &str,
        task: &str,
    ) -> PromptContext {
        let window = self.recency.lock().await.window(self.settings.recency_window);
        ContextBuilder::new()
            .recency(window)
            .memory(&self.memory, memory_query, self.settings.memory_top_k)
            .knowledge(
                self.knowledge.as_ref(),
                knowledge_query,
                self.settings.knowledge_top_k,
            )
            .build(task)
            .await
    }
}
