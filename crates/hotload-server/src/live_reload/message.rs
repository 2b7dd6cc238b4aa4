//! Outbound WebSocket message.

use std::borrow::Cow;

use axum::extract::ws::Utf8Bytes;
use hotload_artifact::{BuildArtifact, PluginMetadata};
use serde::Serialize;

/// Serialized message, shared by every connection it is sent to.
pub(crate) type Payload = Utf8Bytes;

/// Message carrying a build to clients.
///
/// ```json
/// { "type": "code", "fileName": "index_1.js", "metadata": { ... }, "code": "..." }
/// ```
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CodeMessage<'a> {
    /// Message type (always "code").
    #[serde(rename = "type")]
    message_type: &'static str,
    /// Artifact file name, distinct per build.
    file_name: &'a str,
    /// Plugin metadata snapshot.
    metadata: &'a PluginMetadata,
    /// Artifact content as text.
    code: Cow<'a, str>,
}

impl<'a> CodeMessage<'a> {
    pub(crate) fn new(artifact: &'a BuildArtifact, metadata: &'a PluginMetadata) -> Self {
        Self {
            message_type: "code",
            file_name: &artifact.file_name,
            metadata,
            code: artifact.code(),
        }
    }

    /// Serialize once for fan-out.
    pub(crate) fn to_payload(&self) -> Result<Payload, serde_json::Error> {
        serde_json::to_string(self).map(Payload::from)
    }
}
