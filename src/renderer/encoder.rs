//! Depth-encoding programs
//!
//! Two pipelines over one shader: the all-geometry encoder for occluders and
//! the top-face encoder for the panel. Each owns its uniform buffer so both
//! passes can be recorded before either is submitted.

use super::camera::LightCamera;
use super::DepthStrategy;
use crate::context::WgpuContext;
use crate::core::buffer::RawUniformBuffer;
use crate::core::pipeline::PipelineBuilder;
use crate::core::render_states::DepthState;
use crate::core::vertex::VertexPN;

/// Uniforms shared by both encoders.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EncoderUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// xyz = top-face normal, w = cosine threshold.
    pub top_normal: [f32; 4],
    /// x = near, y = far.
    pub range: [f32; 4],
}

impl EncoderUniform {
    /// Uniforms for one pass.
    pub fn new(camera: &LightCamera, strategy: &DepthStrategy) -> Self {
        let top_normal = match *strategy {
            DepthStrategy::AllGeometry => [0.0; 4],
            DepthStrategy::TopFace { normal, threshold } => {
                [normal.x, normal.y, normal.z, threshold]
            }
        };
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            view: camera.view.to_cols_array_2d(),
            top_normal,
            range: [camera.near, camera.far, 0.0, 0.0],
        }
    }
}

/// A compiled depth-encoding program.
pub struct DepthEncoder {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: RawUniformBuffer,
    bind_group: wgpu::BindGroup,
}

impl DepthEncoder {
    /// Encoder that writes the depth of every fragment.
    pub fn all_geometry(ctx: &WgpuContext, format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        Self::new(ctx, format, "fs_all", "all-geometry depth encoder")
    }

    /// Encoder that only writes fragments facing the top normal.
    pub fn top_face(ctx: &WgpuContext, format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        Self::new(ctx, format, "fs_top_face", "top-face depth encoder")
    }

    fn new(
        ctx: &WgpuContext,
        format: wgpu::TextureFormat,
        fragment_entry: &str,
        label: &str,
    ) -> anyhow::Result<Self> {
        let shader = include_str!("../shaders/depth_encode.wgsl");

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("depth encoder bind group layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });

        let pipeline = PipelineBuilder::new(ctx)
            .label(label)
            .shader(shader)
            .fragment_entry(fragment_entry)
            .vertex_layout(VertexPN::layout())
            .bind_group_layout(&bind_group_layout)
            .color_format(format)
            .depth(DepthState::read_write())
            .build()?;

        let uniform_buffer = RawUniformBuffer::new(
            ctx,
            std::mem::size_of::<EncoderUniform>() as u64,
            Some(label),
        );

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.buffer().as_entire_binding(),
            }],
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
        })
    }

    /// Upload the uniforms for the next pass.
    pub fn update(&self, ctx: &WgpuContext, camera: &LightCamera, strategy: &DepthStrategy) {
        self.uniform_buffer
            .write(ctx, &EncoderUniform::new(camera, strategy));
    }

    /// Get the render pipeline.
    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Get the uniform bind group.
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
