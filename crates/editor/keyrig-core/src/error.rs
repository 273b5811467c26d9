//! Error type for editor operations.

use serde::{Deserialize, Serialize};

/// Every rejected operation carries its own reason so hosts can show a specific message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EditorError {
    #[error("load a model first")]
    NoModelLoaded,

    #[error("no bone selected")]
    NoBoneSelected,

    #[error("operation unavailable during playback")]
    PlaybackActive,

    #[error("operation unavailable while dragging the gizmo")]
    GizmoDragActive,

    #[error("bone not found in the current skeleton: {name}")]
    UnknownBone { name: String },

    #[error("no keyframes")]
    NoKeyframes,

    #[error("no keyframes to export")]
    NothingToExport,

    #[error("no valid animation tracks to export")]
    NoExportableTracks,

    #[error("animation duration must be a positive number, got {duration}")]
    InvalidDuration { duration: f64 },

    #[error("invalid JSON: {reason}")]
    InvalidDocument { reason: String },

    #[error("JSON parse error: {reason}")]
    Parse { reason: String },

    #[error(
        "no compatible animation tracks for the current skeleton (skipped bones: {})",
        .skipped_bones.join(", ")
    )]
    NoCompatibleTracks { skipped_bones: Vec<String> },

    #[error("unsupported animation file type: {file_name} (expected .fbx, .glb or .gltf)")]
    UnsupportedFileType { file_name: String },

    #[error("failed to decode asset: {reason}")]
    AssetDecode { reason: String },

    #[error("no animations found in the imported file")]
    NoAnimationsInAsset,
}

impl EditorError {
    pub fn invalid_document(reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            reason: reason.into(),
        }
    }

    /// Error group for host messaging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoModelLoaded
            | Self::NoBoneSelected
            | Self::PlaybackActive
            | Self::GizmoDragActive
            | Self::UnknownBone { .. }
            | Self::NoKeyframes
            | Self::NothingToExport
            | Self::NoExportableTracks => "precondition",
            Self::InvalidDuration { .. }
            | Self::InvalidDocument { .. }
            | Self::Parse { .. }
            | Self::NoCompatibleTracks { .. } => "validation",
            Self::UnsupportedFileType { .. }
            | Self::AssetDecode { .. }
            | Self::NoAnimationsInAsset => "io",
        }
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
