// SPDX-License-Identifier: MIT

//! Persistent interaction memory retrieved by similarity

use super::index::{Metadata, VectorIndex};
use crate::adk::error::IndexError;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// A retrieved memory with `similarity = 1 - distance`
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    pub content: String,
    pub metadata: Metadata,
    pub similarity: f32,
}

impl MemoryRecord {
    pub fn timestamp(&self) -> &str {
        self.metadata
            .get("timestamp")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}

/// Namespace-scoped long-term memory
#[derive(Clone)]
pub struct SemanticStore {
    namespace: String,
    index: Arc<dyn VectorIndex>,
}

impl SemanticStore {
    pub fn new(namespace: impl Into<String>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            namespace: namespace.into(),
            index,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Write one record; `timestamp` defaults to now (RFC 3339)
    pub async fn store(&self, text: &str, mut metadata: Metadata) -> Result<(), IndexError> {
        metadata
            .entry("timestamp")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        self.index.add(vec![text.to_string()], vec![metadata]).await?;
        log::info!("Stored interaction in memory '{}'", self.namespace);
        Ok(())
    }

    /// Up to `k` records, most similar first
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<MemoryRecord>, IndexError> {
        let hits = self.index.search(query, k).await?;
        Ok(hits
            .into_iter()
            .map(|hit| MemoryRecord {
                content: hit.content,
                metadata: hit.metadata,
                similarity: 1.0 - hit.distance,
            })
            .collect())
    }

    /// Retrieved records as provenance-tagged text, empty when nothing matches
    pub async fn context(&self, query: &str, k: usize) -> Result<String, IndexError> {
        let records = self.retrieve(query, k).await?;
        Ok(format_records(&records))
    }
}

pub(crate) fn format_records(records: &[MemoryRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[Past Interaction {} - {}]\n{}\n",
                i + 1,
                r.timestamp(),
                r.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}
