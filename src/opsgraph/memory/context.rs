//! Prompt context assembly
//!
//! Sections always appear in the same order: recent conversation, past
//! interactions, knowledge base, then the task itself. An empty section is
//! rendered as `no prior context` rather than dropped.

use super::semantic::SemanticStore;
use crate::opsgraph::knowledge::KnowledgeBase;

/// Placeholder for a section with nothing to show
pub const NO_PRIOR_CONTEXT: &str = "no prior context";

/// Assembled context handed to a generation step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    pub recency: String,
    pub memory: String,
    pub knowledge: String,
    pub task: String,
}

fn or_placeholder(section: &str) -> &str {
    if section.trim().is_empty() {
        NO_PRIOR_CONTEXT
    } else {
        section
    }
}

impl PromptContext {
    pub fn render(&self) -> String {
        format!(
            "Recent conversation:\n{}\n\n---\n\nPast similar interactions:\n{}\n\n---\n\nKnowledge base:\n{}\n\n---\n\nTask:\n{}",
            or_placeholder(&self.recency),
            or_placeholder(&self.memory),
            or_placeholder(&self.knowledge),
            self.task
        )
    }
}

/// Collects context from each tier; retrieval failures are logged and left empty
pub struct ContextBuilder<'a> {
    recency: String,
    memory: Option<(&'a SemanticStore, String, usize)>,
    knowledge: Option<(&'a KnowledgeBase, String, usize)>,
}

impl<'a> ContextBuilder<'a> {
    pub fn new() -> Self {
        Self {
            recency: String::new(),
            memory: None,
            knowledge: None,
        }
    }

    /// Pre-rendered recency window
    pub fn recency(mut self, window: String) -> Self {
        self.recency = window;
        self
    }

    pub fn memory(mut self, store: &'a SemanticStore, query: impl Into<String>, k: usize) -> Self {
        self.memory = Some((store, query.into(), k));
        self
    }

    pub fn knowledge(mut self, kb: Option<&'a KnowledgeBase>, query: impl Into<String>, k: usize) -> Self {
        self.knowledge = kb.map(|kb| (kb, query.into(), k));
        self
    }

    pub async fn build(self, task: &str) -> PromptContext {
        let memory = match self.memory {
            Some((store, query, k)) => match store.context(&query, k).await {
                Ok(text) => {
                    if text.is_empty() {
                        log::info!("No relevant past interactions in '{}'", store.namespace());
                    }
                    text
                }
                Err(e) => {
                    log::warn!("Memory retrieval from '{}' failed: {}", store.namespace(), e);
                    String::new()
                }
            },
            None => String::new(),
        };

        let knowledge = match self.knowledge {
            Some((kb, query, k)) => kb.context(&query, k).await.unwrap_or_else(|e| {
                log::warn!("Knowledge base retrieval failed: {}", e);
                String::new()
            }),
            None => String::new(),
        };

        PromptContext {
            recency: self.recency,
            memory,
            knowledge,
            task: task.to_string(),
        }
    }
}

impl Default for ContextBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}
