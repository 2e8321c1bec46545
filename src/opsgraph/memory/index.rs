// SPDX-License-Identifier: MIT

//! Similarity-search collaborators
//!
//! `VectorIndex` is the seam the memory tiers and the knowledge base search
//! through. Two brute-force implementations ship here: `LocalVectorIndex`
//! persists one JSON file per namespace, `InMemoryIndex` keeps nothing on disk.

use crate::adk::error::{IndexError, ModelError};
use crate::adk::model::Embedder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Free-form record metadata
pub type Metadata = Map<String, Value>;

/// One search result, closest first in a result list
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub content: String,
    pub metadata: Metadata,
    pub distance: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append texts with their metadata. Repeated calls never deduplicate.
    async fn add(&self, texts: Vec<String>, metadatas: Vec<Metadata>) -> Result<(), IndexError>;

    /// Up to `k` hits ordered by ascending distance
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, IndexError>;

    async fn len(&self) -> usize;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    content: String,
    metadata: Metadata,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NamespaceFile {
    namespace: String,
    entries: Vec<StoredEntry>,
}

/// Cosine distance in [0, 2]; a zero vector is treated as orthogonal
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let nb = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot / (na * nb)
}

fn rank(entries: &[StoredEntry], query: &[f32], k: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = entries
        .iter()
        .map(|e| SearchHit {
            content: e.content.clone(),
            metadata: e.metadata.clone(),
            distance: cosine_distance(query, &e.embedding),
        })
        .collect();
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(k);
    hits
}

async fn embed_entries(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    metadatas: Vec<Metadata>,
) -> Result<Vec<StoredEntry>, IndexError> {
    if texts.len() != metadatas.len() {
        return Err(IndexError::LengthMismatch {
            texts: texts.len(),
            metadatas: metadatas.len(),
        });
    }
    let embeddings = embedder.embed(&texts).await?;
    Ok(texts
        .into_iter()
        .zip(metadatas)
        .zip(embeddings)
        .map(|((content, metadata), embedding)| StoredEntry {
            content,
            metadata,
            embedding,
        })
        .collect())
}

async fn embed_query(embedder: &dyn Embedder, query: &str) -> Result<Vec<f32>, IndexError> {
    embedder
        .embed(&[query.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            IndexError::Embedding(ModelError::InvalidResponse(
                "no embedding returned for query".to_string(),
            ))
        })
}

/// Namespace-scoped index persisted as `<dir>/<namespace>.json`
pub struct LocalVectorIndex {
    namespace: String,
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredEntry>>,
}

impl LocalVectorIndex {
    /// Open a namespace, creating an empty one if it does not exist yet
    pub async fn open(
        dir: impl AsRef<Path>,
        namespace: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, IndexError> {
        let path = Self::file_path(dir.as_ref(), namespace);
        if tokio::fs::try_exists(&path).await? {
            return Self::load(path, namespace, embedder).await;
        }

        log::info!("Creating index namespace '{}' at {}", namespace, path.display());
        Self::create(dir, namespace, embedder).await
    }

    /// Start a namespace from scratch, discarding any persisted entries
    pub async fn create(
        dir: impl AsRef<Path>,
        namespace: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, IndexError> {
        let index = Self {
            namespace: namespace.to_string(),
            path: Self::file_path(dir.as_ref(), namespace),
            embedder,
            entries: RwLock::new(Vec::new()),
        };
        index.persist(&[]).await?;
        Ok(index)
    }

    /// Open a namespace that must already have been built
    pub async fn open_existing(
        dir: impl AsRef<Path>,
        namespace: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, IndexError> {
        let path = Self::file_path(dir.as_ref(), namespace);
        if !tokio::fs::try_exists(&path).await? {
            return Err(IndexError::NotFound {
                namespace: namespace.to_string(),
                path: path.display().to_string(),
            });
        }
        Self::load(path, namespace, embedder).await
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_path(dir: &Path, namespace: &str) -> PathBuf {
        dir.join(format!("{namespace}.json"))
    }

    async fn load(path: PathBuf, namespace: &str, embedder: Arc<dyn Embedder>) -> Result<Self, IndexError> {
        let raw = tokio::fs::read_to_string(&path).await?;
        let file: NamespaceFile = serde_json::from_str(&raw)?;
        log::debug!(
            "Loaded index namespace '{}' with {} entries",
            namespace,
            file.entries.len()
        );
        Ok(Self {
            namespace: namespace.to_string(),
            path,
            embedder,
            entries: RwLock::new(file.entries),
        })
    }

    async fn persist(&self, entries: &[StoredEntry]) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = NamespaceFile {
            namespace: self.namespace.clone(),
            entries: entries.to_vec(),
        };
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(&file)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn add(&self, texts: Vec<String>, metadatas: Vec<Metadata>) -> Result<(), IndexError> {
        let new_entries = embed_entries(self.embedder.as_ref(), texts, metadatas).await?;
        let mut entries = self.entries.write().await;
        let mut updated = entries.clone();
        updated.extend(new_entries);
        self.persist(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let query = embed_query(self.embedder.as_ref(), query).await?;
        let entries = self.entries.read().await;
        Ok(rank(&entries, &query, k))
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Unpersisted index for tests and throwaway sessions
pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add(&self, texts: Vec<String>, metadatas: Vec<Metadata>) -> Result<(), IndexError> {
        let new_entries = embed_entries(self.embedder.as_ref(), texts, metadatas).await?;
        self.entries.write().await.extend(new_entries);
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let query = embed_query(self.embedder.as_ref(), query).await?;
        Ok(rank(&self.entries.read().await, &query, k))
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
