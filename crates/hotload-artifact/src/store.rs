//! Build output directory access.
//!
//! The bundler writes the plugin as `index_<hash>.js` into the output
//! directory. [`ArtifactStore`] finds that file and reads it whole.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use serde::Deserialize;

use crate::error::ArtifactError;

/// File name prefix of a build artifact.
pub const ARTIFACT_PREFIX: &str = "index_";

/// File name suffix of a build artifact.
pub const ARTIFACT_SUFFIX: &str = ".js";

/// Check whether a file name follows the `index_*.js` convention.
#[must_use]
pub fn is_artifact_name(name: &str) -> bool {
    name.starts_with(ARTIFACT_PREFIX) && name.ends_with(ARTIFACT_SUFFIX)
}

/// A build artifact read from the output directory.
///
/// Loaded fresh for every send; never cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildArtifact {
    /// File name without directory (e.g. `index_a1b2c3.js`).
    pub file_name: String,
    /// Raw file content.
    pub content: Vec<u8>,
    /// Content length in bytes.
    pub size_bytes: usize,
}

impl BuildArtifact {
    /// Content as text. Invalid UTF-8 sequences are replaced.
    #[must_use]
    pub fn code(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Rule for choosing one artifact when several match the naming convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSelection {
    /// Most recently modified file; ties go to the lowest file name.
    #[default]
    Newest,
    /// Lowest file name in byte order.
    First,
}

impl fmt::Display for ArtifactSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Newest => f.write_str("newest"),
            Self::First => f.write_str("first"),
        }
    }
}

/// Error for an unrecognized [`ArtifactSelection`] name.
#[derive(Debug, thiserror::Error)]
#[error("Unknown artifact selection '{0}' (expected 'newest' or 'first')")]
pub struct UnknownSelection(String);

impl FromStr for ArtifactSelection {
    type Err = UnknownSelection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "first" => Ok(Self::First),
            other => Err(UnknownSelection(other.to_owned())),
        }
    }
}

/// Candidate artifact found while listing the directory.
struct Candidate {
    name: String,
    modified: SystemTime,
}

/// Reads build artifacts from the output directory.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dist_dir: PathBuf,
    selection: ArtifactSelection,
}

impl ArtifactStore {
    /// Create a store for the given output directory.
    #[must_use]
    pub fn new(dist_dir: PathBuf) -> Self {
        Self {
            dist_dir,
            selection: ArtifactSelection::default(),
        }
    }

    /// Set the rule used when several files match.
    #[must_use]
    pub fn with_selection(mut self, selection: ArtifactSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Output directory being read.
    #[must_use]
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Selection rule in effect.
    #[must_use]
    pub fn selection(&self) -> ArtifactSelection {
        self.selection
    }

    /// Create the output directory (and parents) if it does not exist.
    ///
    /// Returns `true` when the directory was created by this call.
    pub fn ensure_dir(&self) -> std::io::Result<bool> {
        if self.dist_dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dist_dir)?;
        tracing::info!(dir = %self.dist_dir.display(), "Created output directory");
        Ok(true)
    }

    /// Load the current build artifact.
    ///
    /// Lists the output directory (not recursively), selects one `index_*.js`
    /// file according to [`ArtifactSelection`] and reads it fully.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::NotFound`] if the directory is missing or has
    /// no matching file, and [`ArtifactError::Io`] if listing or reading fails.
    pub fn load_latest(&self) -> Result<BuildArtifact, ArtifactError> {
        let name = self
            .select()?
            .ok_or_else(|| ArtifactError::NotFound(self.dist_dir.clone()))?;
        let path = self.dist_dir.join(&name);
        let content = fs::read(&path).map_err(|e| ArtifactError::io(e, path))?;

        Ok(BuildArtifact {
            file_name: name,
            size_bytes: content.len(),
            content,
        })
    }

    /// Pick the artifact file name, if any.
    fn select(&self) -> Result<Option<String>, ArtifactError> {
        let candidates = self.candidates()?;
        let chosen = match self.selection {
            ArtifactSelection::Newest => candidates.into_iter().max_by(|a, b| {
                a.modified
                    .cmp(&b.modified)
                    .then_with(|| b.name.cmp(&a.name))
            }),
            ArtifactSelection::First => candidates.into_iter().min_by(|a, b| a.name.cmp(&b.name)),
        };
        Ok(chosen.map(|c| c.name))
    }

    /// List regular files matching the naming convention.
    fn candidates(&self) -> Result<Vec<Candidate>, ArtifactError> {
        let entries =
            fs::read_dir(&self.dist_dir).map_err(|e| ArtifactError::io(e, self.dist_dir.clone()))?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ArtifactError::io(e, self.dist_dir.clone()))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !is_artifact_name(&name) {
                continue;
            }
            // Follows symlinks; the entry may vanish between listing and stat
            // while the bundler rewrites it
            let Ok(metadata) = fs::metadata(entry.path()) else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            candidates.push(Candidate {
                name,
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(candidates)
    }
}
