// SPDX-License-Identifier: MIT

//! Typed error handling for opsgraph-rs
//!
//! Errors fall into two groups. Recoverable collaborator failures
//! (`ModelError`, `ParseError`, `IndexError`, `SinkError`) are caught by the
//! node that made the call and turned into `errors` entries in workflow state.
//! Everything that reaches the executor as an `OpsGraphError` ends the run.

use thiserror::Error;

/// Top-level error type for opsgraph-rs
#[derive(Debug, Error)]
pub enum OpsGraphError {
    /// Configuration errors (missing settings, missing backing store, bad graph wiring)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workflow construction or execution errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Generation capability failures that were not handled at the call site
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Similarity-search collaborator failures
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Artifact sink failures
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Operator channel failures (closed input, terminal I/O)
    #[error("Operator error: {0}")]
    Operator(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Graph construction and execution errors
#[derive(Debug, Error, PartialEq)]
pub enum WorkflowError {
    /// A conditional route function produced a label missing from its branch table
    #[error("Route function on node '{node}' returned unknown label '{label}'")]
    UnknownRouteLabel { node: String, label: String },

    /// The executor was asked to run a node that is not registered
    #[error("Node '{0}' is not registered")]
    UnknownNode(String),

    /// A node was registered twice
    #[error("Node '{0}' is registered more than once")]
    DuplicateNode(String),

    /// A node id collides with a reserved marker
    #[error("Node id '{0}' is reserved")]
    ReservedNodeId(String),

    /// An edge refers to a node that does not exist
    #[error("Edge {from} -> {to} refers to an unknown node")]
    DanglingEdge { from: String, to: String },

    /// A node has more than one outgoing edge
    #[error("Node '{0}' has more than one outgoing edge")]
    DuplicateEdge(String),

    /// A node has no outgoing edge and is not terminal
    #[error("Node '{0}' has no outgoing edge")]
    MissingEdge(String),

    /// No entry point was set
    #[error("Graph has no entry point")]
    MissingEntryPoint,

    /// The run exceeded the configured step limit
    #[error("Step limit of {0} reached")]
    StepLimitExceeded(usize),
}

/// Generation capability errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Provider not supported
    #[error("Provider not supported: {0}")]
    UnsupportedProvider(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Non-success status from the provider
    #[error("API error from {provider} ({status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Transport errors, including timeouts
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Structured decoding failures of generated output
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    /// Output was not valid JSON
    #[error("JSON parse error: {0}")]
    InvalidJson(String),

    /// Output was JSON but not the expected shape
    #[error("Unexpected shape: expected {expected}, found {found}")]
    UnexpectedShape { expected: String, found: String },

    /// A section of a multi-part response was absent
    #[error("Missing section: {0}")]
    MissingSection(String),
}

/// Similarity-search collaborator errors
#[derive(Debug, Error)]
pub enum IndexError {
    /// The embedding call failed
    #[error("Embedding failed: {0}")]
    Embedding(#[from] ModelError),

    /// texts and metadatas passed to `add` differ in length
    #[error("Got {texts} texts but {metadatas} metadata entries")]
    LengthMismatch { texts: usize, metadatas: usize },

    /// The persisted namespace does not exist
    #[error("Index namespace '{namespace}' not found at {path}")]
    NotFound { namespace: String, path: String },

    /// Persistence I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Persistence encoding failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Artifact sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Destination could not be written (disk full, permissions)
    #[error("Failed to write {destination}: {source}")]
    Write {
        destination: String,
        #[source]
        source: std::io::Error,
    },

    /// Artifact could not be encoded
    #[error("Failed to encode {destination}: {message}")]
    Encode {
        destination: String,
        message: String,
    },
}

impl OpsGraphError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an operator channel error
    pub fn operator(message: impl Into<String>) -> Self {
        Self::Operator(message.into())
    }

    /// True for failures that must stop the run with a diagnostic
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Config(_) | Self::Index(IndexError::NotFound { .. }) => true,
            Self::Workflow(e) => !matches!(e, WorkflowError::StepLimitExceeded(_)),
            Self::Model(e) => matches!(
                e,
                ModelError::ApiKeyMissing(_) | ModelError::UnsupportedProvider(_)
            ),
            _ => false,
        }
    }
}

impl From<&str> for OpsGraphError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for OpsGraphError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
