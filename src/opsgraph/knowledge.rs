// SPDX-License-Identifier: MIT

//! Knowledge base: markdown documents chunked into a similarity index

use crate::adk::error::{IndexError, OpsGraphError};
use crate::opsgraph::memory::index::{Metadata, VectorIndex};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Index namespace holding knowledge-base chunks
pub const KNOWLEDGE_NAMESPACE: &str = "knowledge_base";

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A loaded source document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: PathBuf,
    pub content: String,
}

/// Recursive character splitter: paragraph, then line, then word, then character
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let pos = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(pos).copied().unwrap_or("");
        let remaining = separators.get(pos + 1..).unwrap_or(&[]);

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut small = Vec::new();
        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge(std::mem::take(&mut small), separator));
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_with(&piece, remaining));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge(small, separator));
        }
        chunks
    }

    /// Greedily pack pieces into chunks, carrying up to `chunk_overlap` chars over
    fn merge(&self, pieces: Vec<String>, separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<String> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(&piece);
            let joiner = if current.is_empty() { 0 } else { sep_len };
            if total + len + joiner > self.chunk_size && !current.is_empty() {
                push_joined(&mut chunks, &current, separator);
                while total > self.chunk_overlap
                    || (total > 0
                        && total + len + if current.is_empty() { 0 } else { sep_len }
                            > self.chunk_size)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(&front) + if current.is_empty() { 0 } else { sep_len };
                }
            }
            total += len + if current.is_empty() { 0 } else { sep_len };
            current.push_back(piece);
        }
        push_joined(&mut chunks, &current, separator);
        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(chunks: &mut Vec<String>, parts: &VecDeque<String>, separator: &str) {
    let joined = parts.iter().map(String::as_str).collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Load every `*.md` file below `dir`, sorted by path
pub async fn load_markdown(dir: &Path) -> Result<Vec<Document>, OpsGraphError> {
    let mut pending = vec![dir.to_path_buf()];
    let mut files = Vec::new();
    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("md") {
                files.push(path);
            }
        }
    }
    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for source in files {
        let content = tokio::fs::read_to_string(&source).await?;
        documents.push(Document { source, content });
    }
    Ok(documents)
}

/// Chunk the knowledge-base directory into `index`; returns the chunk count
pub async fn build_index(
    kb_dir: &Path,
    index: &dyn VectorIndex,
    splitter: TextSplitter,
) -> Result<usize, OpsGraphError> {
    if !kb_dir.is_dir() {
        return Err(OpsGraphError::config(format!(
            "Knowledge base directory not found: {}",
            kb_dir.display()
        )));
    }

    log::info!("Loading documents from {}...", kb_dir.display());
    let documents = load_markdown(kb_dir).await?;
    log::info!("Loaded {} documents", documents.len());

    let mut texts = Vec::new();
    let mut metadatas = Vec::new();
    for doc in &documents {
        for chunk in splitter.split(&doc.content) {
            let mut meta = Metadata::new();
            meta.insert("source".to_string(), json!(doc.source.display().to_string()));
            texts.push(chunk);
            metadatas.push(meta);
        }
    }
    let count = texts.len();
    log::info!("Created {} chunks", count);

    if count > 0 {
        index.add(texts, metadatas).await?;
    }
    log::info!("Knowledge index built with {} chunks", count);
    Ok(count)
}

/// Retrieval over the indexed knowledge base
#[derive(Clone)]
pub struct KnowledgeBase {
    index: Arc<dyn VectorIndex>,
}

impl KnowledgeBase {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Hits as `[Source: file]` blocks, empty when nothing matches
    pub async fn context(&self, query: &str, k: usize) -> Result<String, IndexError> {
        let hits = self.index.search(query, k).await?;
        let blocks: Vec<String> = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                let source = source_name(&hit.metadata);
                log::info!(
                    "Retrieved [{}] {} (similarity: {:.2})",
                    i + 1,
                    source,
                    1.0 - hit.distance
                );
                format!("[Source: {}]\n{}\n", source, hit.content)
            })
            .collect();
        log::info!("Retrieved {} knowledge base chunks", blocks.len());
        Ok(blocks.join("\n---\n"))
    }
}

fn source_name(metadata: &Metadata) -> String {
    metadata
        .get("source")
        .and_then(Value::as_str)
        .and_then(|s| Path::new(s).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Unknown".to_string())
}
