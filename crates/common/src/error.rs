//! Error types shared across CutFlow crates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for CutFlow operations.
///
/// `Validation` errors are raised synchronously before the external tool
/// is ever started. `ExternalTool` and `OutputMissing` only surface once
/// the render process has finished.
#[derive(Debug, thiserror::Error)]
pub enum CutflowError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Compilation error: {message}")]
    Compilation { message: String },

    #[error("External tool failed (status {status}): {message}")]
    ExternalTool { status: String, message: String },

    #[error("Render finished but no output was produced at {path}")]
    OutputMissing { path: PathBuf },

    #[error("Timeline model error: {message}")]
    Model { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CutflowError.
pub type CutflowResult<T> = Result<T, CutflowError>;

/// Structured error body returned to export callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
}

impl CutflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn compilation(msg: impl Into<String>) -> Self {
        Self::Compilation {
            message: msg.into(),
        }
    }

    pub fn external_tool(status: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExternalTool {
            status: status.into(),
            message: msg.into(),
        }
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Stable snake_case tag for this error's category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } | Self::FileNotFound { .. } => "validation_error",
            Self::Compilation { .. } => "compilation_error",
            Self::ExternalTool { .. } => "external_tool_error",
            Self::OutputMissing { .. } => "output_missing_error",
            Self::Model { .. } => "model_error",
            Self::Config { .. } => "config_error",
            Self::Unsupported { .. } => "unsupported",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Other(_) => "internal_error",
        }
    }

    /// Whether this error was detected before any external process ran.
    pub fn is_synchronous(&self) -> bool {
        !matches!(self, Self::ExternalTool { .. } | Self::OutputMissing { .. })
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}
