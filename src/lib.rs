//! Sunshade
//!
//! Measures how much of a solar panel's top face is in shadow, by rendering the
//! scene's occluders and the panel into two depth buffers from the sun and
//! comparing them per pixel.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **context** - Core wgpu wrapper (Adapter, Device, Queue)
//! 2. **core** - GPU primitives (buffers, textures, pipelines, readback)
//! 3. **scene** - Read-only scene access, meshes, world-space baking
//! 4. **renderer** - Sun light, light camera fitting, depth renderers (wgpu and CPU)
//! 5. **coverage** - Coverage calculator, comparison, result cache

pub mod context;
pub mod core;
pub mod coverage;
pub mod error;
pub mod renderer;
pub mod scene;

// Re-export commonly used types
pub use context::WgpuContext;

pub use core::{
    ClearState, DepthState, DepthTexture, IndexBuffer, PipelineBuilder,
    RawUniformBuffer, ReadbackBuffer, Texture2D, VertexBuffer, VertexPN,
};

pub use coverage::{
    Clock, CoverageCache, CoverageCalculator, CoverageConfig, CoverageResult, PixelTally,
    SystemClock,
};

pub use error::CoverageError;

pub use renderer::{
    DebugImage, DepthRenderer, DepthStrategy, DepthTarget, FitPadding, GpuDepthRenderer,
    LightCamera, RenderState, SoftwareDepthRenderer, StateGuard, SunLight, TargetFormat,
};

pub use scene::{Aabb, BakedMesh, MeshData, NodeId, Renderable, Scene, SceneProvider, Transform};

/// Everything needed to set up a scene and compute coverage.
pub mod prelude {
    pub use crate::context::WgpuContext;
    pub use crate::coverage::{CoverageCalculator, CoverageConfig, CoverageResult};
    pub use crate::error::CoverageError;
    pub use crate::renderer::{DepthRenderer, DepthTarget, SoftwareDepthRenderer, SunLight};
    pub use crate::scene::{MeshData, NodeId, Scene, SceneProvider, Transform};
}

// Re-export glam for convenience
pub use glam;
