use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a failed backend request.
///
/// `Cancelled` only travels between a superseded request and the loader that
/// issued it; it is never published to a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    #[error("request failed with status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Message(String),
    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }
}
