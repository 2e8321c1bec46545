// SPDX-License-Identifier: MIT

//! Artifact sinks

use crate::adk::error::SinkError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// A finished artifact ready to be written
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Text(String),
    Json(Value),
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl Artifact {
    /// Encoded bytes for the artifact
    pub fn encode(&self, destination: &str) -> Result<String, SinkError> {
        match self {
            Artifact::Text(text) => Ok(text.clone()),
            Artifact::Json(value) => {
                serde_json::to_string_pretty(value).map_err(|e| SinkError::Encode {
                    destination: destination.to_string(),
                    message: e.to_string(),
                })
            }
            Artifact::Table { headers, rows } => {
                if let Some(bad) = rows.iter().position(|r| r.len() != headers.len()) {
                    return Err(SinkError::Encode {
                        destination: destination.to_string(),
                        message: format!(
                            "row {} has {} cells, expected {}",
                            bad + 1,
                            rows[bad].len(),
                            headers.len()
                        ),
                    });
                }
                let mut out = csv_line(headers);
                for row in rows {
                    out.push_str(&csv_line(row));
                }
                Ok(out)
            }
        }
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_line(fields: &[String]) -> String {
    let mut line = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

/// Destination for finished artifacts
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Write `artifact` to `destination` and return where it landed
    async fn write(&self, destination: &str, artifact: &Artifact) -> Result<String, SinkError>;
}

/// Writes artifacts below a root directory
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactSink for FsSink {
    async fn write(&self, destination: &str, artifact: &Artifact) -> Result<String, SinkError> {
        let body = artifact.encode(destination)?;
        let path = self.root.join(destination);
        let io_err = |source: std::io::Error| SinkError::Write {
            destination: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, body).await.map_err(io_err)?;
        log::info!("Saved {}", path.display());
        Ok(path.display().to_string())
    }
}
