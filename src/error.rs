use thiserror::Error;

/// A document could not be opened. Shown inline in the viewer pane; the
/// viewer stays open so the user can retry or close it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("could not reach {path}: {reason}")]
    Unreachable { path: String, reason: String },
    #[error("{path} is not a readable document: {reason}")]
    Invalid { path: String, reason: String },
    #[error("{path} has no pages")]
    Empty { path: String },
}

impl LoadError {
    pub fn path(&self) -> &str {
        match self {
            Self::Unreachable { path, .. } | Self::Invalid { path, .. } | Self::Empty { path } => {
                path
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The render was superseded before it finished. Never surfaced to the user.
    #[error("render cancelled")]
    Cancelled,
    #[error("failed to render page {page}: {reason}")]
    Failed { page: u32, reason: String },
}

impl RenderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn failed(page: u32, reason: impl std::fmt::Display) -> Self {
        Self::Failed {
            page,
            reason: reason.to_string(),
        }
    }
}
