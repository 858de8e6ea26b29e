//! Error types

use crate::scene::NodeId;

/// Errors surfaced by a coverage computation.
///
/// Precision fallback and degenerate geometry are not errors; they are
/// handled locally and show up in the returned result instead.
#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    /// The panel id does not name a node with geometry.
    #[error("panel {0:?} is not a renderable node of the scene")]
    PanelNotFound(NodeId),

    /// Rejected configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pass was issued with no render target bound.
    #[error("no depth target is active")]
    NoActiveTarget,

    /// Copying a depth buffer back to the host failed (device lost, mapping
    /// failure).
    #[error("depth readback failed: {0:#}")]
    Readback(anyhow::Error),

    /// The two depth buffers did not have the same number of pixels.
    #[error("depth buffers differ in size: panel {panel} px, occluder {occluder} px")]
    BufferMismatch { panel: usize, occluder: usize },

    /// The calculator's GPU resources were already released.
    #[error("coverage calculator has been disposed")]
    Disposed,

    /// GPU resource or pipeline creation failed.
    #[error(transparent)]
    Gpu(#[from] anyhow::Error),
}
