//! Error types for the content pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a content file into a [`ContentItem`](crate::content::ContentItem)
#[derive(Error, Debug)]
pub enum ContentError {
    /// No `---` marker anywhere in the file; not a content file at all
    #[error("front-matter opening delimiter not found")]
    MissingOpeningDelimiter,

    /// An opening `---` without a matching closing one; a malformed file
    #[error("front-matter closing delimiter not found")]
    MissingClosingDelimiter,

    #[error("invalid front-matter: {0}")]
    InvalidFrontMatter(#[from] serde_yaml::Error),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path has no collection directory: {0:?}")]
    InvalidPath(PathBuf),

    /// The item is marked `draft: true`. Not a failure; callers skip it.
    #[error("content is marked as draft: {0:?}")]
    Draft(PathBuf),
}

impl ContentError {
    /// True for the distinguished draft condition
    pub fn is_draft(&self) -> bool {
        matches!(self, ContentError::Draft(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ContentError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;
