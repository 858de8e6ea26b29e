//! Core rendering abstractions
//!
//! This module provides mid-level abstractions over wgpu primitives.

pub mod buffer;
pub mod pipeline;
pub mod readback;
pub mod render_states;
pub mod texture;
pub mod vertex;

pub use buffer::{IndexBuffer, RawUniformBuffer, ReadbackBuffer, VertexBuffer};
pub use pipeline::PipelineBuilder;
pub use readback::{padded_bytes_per_row, read_texture};
pub use render_states::{ClearState, DepthState};
pub use texture::{DepthTexture, Texture2D};
pub use vertex::VertexPN;
