use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Outcome of one generation attempt. Exactly one variant is populated and the
/// value is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionResult {
    Success { artifact_path: PathBuf },
    Failure { message: String },
}

impl ExecutionResult {
    pub fn success(artifact_path: impl Into<PathBuf>) -> Self {
        Self::Success {
            artifact_path: artifact_path.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        match self {
            Self::Success { artifact_path } => Some(artifact_path),
            Self::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message } => Some(message),
        }
    }
}
