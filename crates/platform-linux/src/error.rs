//! Error types for snapshot collection

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while collecting a process snapshot
#[derive(Debug, Error)]
pub enum CollectError {
    /// The process information directory could not be listed
    #[error("Cannot read process directory {}: {source}", .path.display())]
    ProcUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No process information directory on this platform
    #[error("Process listing is not supported on this platform")]
    UnsupportedPlatform,
}

impl CollectError {
    /// Check if this is a permission problem
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            CollectError::ProcUnavailable { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied
        )
    }
}

/// Result type for snapshot collection
pub type CollectResult<T> = Result<T, CollectError>;
