use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOperation {
    Extract,
    Summarize,
    Compare,
    Health,
}

impl BackendOperation {
    /// Message shown to the user when this operation fails on the backend side.
    pub fn failure_message(&self) -> &'static str {
        match self {
            BackendOperation::Extract => {
                "Failed to upload or extract resume. Please try again in a moment."
            }
            BackendOperation::Summarize => "Failed to generate summary. Please try again.",
            BackendOperation::Compare => {
                "Failed to compare the resume against the jobs. Please try again."
            }
            BackendOperation::Health => "The resume screener backend is not reachable.",
        }
    }
}

impl fmt::Display for BackendOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendOperation::Extract => "resume upload",
            BackendOperation::Summarize => "resume summary",
            BackendOperation::Compare => "job comparison",
            BackendOperation::Health => "health check",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Extraction(String),
    #[error("{operation} request failed with status {status}: {body}")]
    BackendStatus {
        operation: BackendOperation,
        status: u16,
        body: String,
    },
    #[error("{operation} request failed: {detail}")]
    Backend {
        operation: BackendOperation,
        detail: String,
    },
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn backend(operation: BackendOperation, detail: impl fmt::Display) -> Self {
        CoreError::Backend {
            operation,
            detail: detail.to_string(),
        }
    }

    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            CoreError::BackendStatus { .. } | CoreError::Backend { .. }
        )
    }

    pub fn operation(&self) -> Option<BackendOperation> {
        match self {
            CoreError::BackendStatus { operation, .. } | CoreError::Backend { operation, .. } => {
                Some(*operation)
            }
            _ => None,
        }
    }

    /// The single string surfaced to the user. Status codes and payloads stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Validation(message) | CoreError::Extraction(message) => message.clone(),
            CoreError::BackendStatus { operation, .. } | CoreError::Backend { operation, .. } => {
                operation.failure_message().to_string()
            }
            CoreError::InvalidSettings(message) => format!("Invalid settings: {message}"),
        }
    }
}
