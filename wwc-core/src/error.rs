//! Error types for the WWC Copilot core.
//!
//! Uses `thiserror` for public API error types. Remote failures (transport,
//! service-reported, malformed envelopes) are normalized into [`RemoteError`];
//! local validation failures never reach the remote layer and live in
//! [`ValidationError`].

use std::path::PathBuf;

use crate::types::{AnalysisKind, PaperId};

/// Top-level error type for the WWC Copilot core library.
#[derive(Debug, thiserror::Error)]
pub enum CopilotError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the remote synthesis service.
///
/// Cloneable so guards can keep the last failure around for display while
/// the caller still receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{message}")]
    Rejected { message: String },

    #[error("{message}")]
    EmptyResponse { message: String },

    #[error("Could not decode response: {message}")]
    Decode { message: String },
}

impl RemoteError {
    /// Message suitable for an acknowledgment dialog.
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::Transport { message, .. } => {
                format!("Could not reach the analysis service: {message}")
            }
            RemoteError::Rejected { message } | RemoteError::EmptyResponse { message } => {
                message.clone()
            }
            RemoteError::Decode { message } => {
                format!("The analysis service returned an unexpected response: {message}")
            }
        }
    }
}

/// Local validation failures. These are reported immediately and never
/// issue a remote call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("At least {required} distinct papers are required, got {actual}")]
    InsufficientPapers { required: usize, actual: usize },

    #[error("Select a subgroup variable before running subgroup analysis")]
    MissingSubgroupVariable,

    #[error("{kind} requires a completed {requires} first")]
    DependencyNotMet {
        kind: AnalysisKind,
        requires: AnalysisKind,
    },

    #[error("Confidence threshold must be between 0 and 1, got {value}")]
    InvalidThreshold { value: f64 },

    #[error("Unknown wizard step: {name}")]
    UnknownStep { name: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from the local progress store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to write progress for paper {paper_id}: {message}")]
    WriteFailed { paper_id: PaperId, message: String },

    #[error("No data directory available; set storage.progress_dir")]
    NoDataDir,
}

/// A type alias for results using the top-level `CopilotError`.
pub type Result<T> = std::result::Result<T, CopilotError>;
