//! Build artifact discovery and plugin metadata for hotload.
//!
//! This crate owns the two read-only inputs of the live reload service:
//!
//! - [`ArtifactStore`] lists the build output directory and loads the current
//!   `index_*.js` bundle as a [`BuildArtifact`]
//! - [`PluginMetadata`] is loaded once from `plugin.json` and falls back to
//!   defaults when the file is missing or malformed
//!
//! Neither type caches anything: the output directory is the source of truth
//! and every [`ArtifactStore::load_latest`] call reads it again.
//!
//! # Example
//!
//! ```ignore
//! use std::path::{Path, PathBuf};
//! use hotload_artifact::{ArtifactStore, PluginMetadata};
//!
//! let metadata = PluginMetadata::load(Path::new("plugin.json"));
//! let store = ArtifactStore::new(PathBuf::from("dist"));
//! let artifact = store.load_latest()?;
//! println!("{} {} ({} bytes)", metadata.name, artifact.file_name, artifact.size_bytes);
//! ```

mod error;
mod metadata;
mod store;

pub use error::ArtifactError;
pub use metadata::PluginMetadata;
pub use store::{
    ARTIFACT_PREFIX, ARTIFACT_SUFFIX, ArtifactSelection, ArtifactStore, BuildArtifact,
    UnknownSelection, is_artifact_name,
};
