// SPDX-License-Identifier: MIT

//! Two-tier memory
//!
//! - [recency] - bounded in-process conversation history
//! - [semantic] - persistent interaction records retrieved by similarity
//! - [index] - similarity-search backends
//! - [context] - assembles both tiers plus knowledge-base hits into a prompt

pub mod context;
pub mod index;
pub mod recency;
pub mod semantic;

pub use context::{ContextBuilder, PromptContext, NO_PRIOR_CONTEXT};
pub use index::{InMemoryIndex, LocalVectorIndex, Metadata, SearchHit, VectorIndex};
pub use recency::{ConversationMessage, RecencyBuffer};
pub use semantic::{MemoryRecord, SemanticStore};

/// First `n` characters of `text`
pub fn preview(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}
