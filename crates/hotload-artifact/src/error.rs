//! Artifact loading errors.

use std::path::PathBuf;

/// Error returned when the current build artifact cannot be loaded.
///
/// Neither variant is fatal to the service: callers log it and skip the
/// dispatch or the late-join sync.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Output directory is missing or holds no `index_*.js` file.
    #[error("No build artifact found in {}", .0.display())]
    NotFound(PathBuf),
    /// Listing the directory or reading the artifact failed.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// Directory or file being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    /// Map an I/O error, treating `NotFound` as a missing artifact.
    pub(crate) fn io(source: std::io::Error, path: PathBuf) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether the error means "nothing built yet" rather than a read failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
