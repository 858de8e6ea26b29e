//! wgpu depth renderer
//!
//! Owns the two off-screen targets and both encoders. Passes are submitted
//! immediately; readback blocks until the queue has drained.

use super::camera::LightCamera;
use super::capability::{negotiate, TargetFormat};
use super::debug::DebugImage;
use super::encoder::DepthEncoder;
use super::{DepthRenderer, DepthStrategy, DepthTarget, RenderState};
use crate::context::WgpuContext;
use crate::core::buffer::{IndexBuffer, VertexBuffer};
use crate::core::readback::read_texture;
use crate::core::texture::{DepthTexture, Texture2D};
use crate::error::CoverageError;
use crate::scene::BakedMesh;
use tracing::{debug, info, trace};

/// Color target plus its depth attachment.
struct DepthBuffer {
    color: Texture2D,
    depth: DepthTexture,
}

impl DepthBuffer {
    fn new(ctx: &WgpuContext, size: u32, format: TargetFormat, label: &str) -> Self {
        Self {
            color: Texture2D::render_target(ctx, size, format.to_wgpu(), Some(label)),
            depth: DepthTexture::new(ctx, size, size, Some(label)),
        }
    }
}

struct Resources {
    occluder: DepthBuffer,
    panel: DepthBuffer,
    all_geometry: DepthEncoder,
    top_face: DepthEncoder,
}

impl Resources {
    fn buffer(&self, target: DepthTarget) -> &DepthBuffer {
        match target {
            DepthTarget::Occluder => &self.occluder,
            DepthTarget::Panel => &self.panel,
        }
    }

    fn encoder(&self, strategy: &DepthStrategy) -> &DepthEncoder {
        match strategy {
            DepthStrategy::AllGeometry => &self.all_geometry,
            DepthStrategy::TopFace { .. } => &self.top_face,
        }
    }
}

/// Depth renderer backed by a wgpu device.
pub struct GpuDepthRenderer {
    ctx: WgpuContext,
    format: TargetFormat,
    resolution: u32,
    state: RenderState,
    resources: Option<Resources>,
    debug_views: [Option<Texture2D>; 2],
}

impl GpuDepthRenderer {
    /// Negotiate the target format and allocate both targets at
    /// `resolution` x `resolution`.
    pub fn new(ctx: WgpuContext, resolution: u32) -> Result<Self, CoverageError> {
        let max = ctx.max_target_size();
        if resolution == 0 || resolution > max {
            return Err(CoverageError::InvalidConfig(format!(
                "resolution {resolution} is outside 1..={max} supported by the device"
            )));
        }

        let format = negotiate(&ctx);
        let resources = Resources {
            occluder: DepthBuffer::new(&ctx, resolution, format, "occluder depth target"),
            panel: DepthBuffer::new(&ctx, resolution, format, "panel depth target"),
            all_geometry: DepthEncoder::all_geometry(&ctx, format.to_wgpu())?,
            top_face: DepthEncoder::top_face(&ctx, format.to_wgpu())?,
        };

        info!("allocated {resolution}x{resolution} {format:?} depth targets");

        Ok(Self {
            ctx,
            format,
            resolution,
            state: RenderState::default(),
            resources: Some(resources),
            debug_views: [None, None],
        })
    }

    /// Create a headless context and a renderer on it (blocks).
    pub fn new_blocking(resolution: u32) -> Result<Self, CoverageError> {
        let ctx = WgpuContext::new_blocking()?;
        Self::new(ctx, resolution)
    }

    /// The context the renderer draws with.
    pub fn context(&self) -> &WgpuContext {
        &self.ctx
    }

    /// The color texture backing `target`, if not released.
    pub fn target_texture(&self, target: DepthTarget) -> Option<&Texture2D> {
        self.resources.as_ref().map(|r| &r.buffer(target).color)
    }

    /// The grayscale debug texture mirroring `target`, if one is shown.
    pub fn debug_view(&self, target: DepthTarget) -> Option<&Texture2D> {
        self.debug_views[slot(target)].as_ref()
    }
}

fn slot(target: DepthTarget) -> usize {
    match target {
        DepthTarget::Occluder => 0,
        DepthTarget::Panel => 1,
    }
}

impl DepthRenderer for GpuDepthRenderer {
    fn format(&self) -> TargetFormat {
        self.format
    }

    fn resolution(&self) -> u32 {
        self.resolution
    }

    fn state(&self) -> RenderState {
        self.state
    }

    fn set_state(&mut self, state: RenderState) {
        self.state = state;
    }

    fn render(
        &mut self,
        strategy: &DepthStrategy,
        camera: &LightCamera,
        mesh: &BakedMesh,
    ) -> Result<(), CoverageError> {
        let resources = self.resources.as_ref().ok_or(CoverageError::Disposed)?;
        let target = self.state.active_target.ok_or(CoverageError::NoActiveTarget)?;
        let buffer = resources.buffer(target);
        let encoder_program = resources.encoder(strategy);

        encoder_program.update(&self.ctx, camera, strategy);

        let (color_load, depth_load) = if self.state.auto_clear {
            (
                self.state.clear.color_load_op(),
                self.state.clear.depth_load_op(),
            )
        } else {
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
        };

        let geometry = (!mesh.is_empty()).then(|| {
            (
                VertexBuffer::new(&self.ctx, mesh.vertices(), Some("baked vertices")),
                IndexBuffer::new(&self.ctx, mesh.indices(), Some("baked indices")),
            )
        });

        let mut encoder = self.ctx.create_encoder(Some("depth encode"));
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("depth encode pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: buffer.color.view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: buffer.depth.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            // An empty mesh still clears the target.
            if let Some((vertices, indices)) = &geometry {
                pass.set_pipeline(encoder_program.pipeline());
                pass.set_bind_group(0, encoder_program.bind_group(), &[]);
                pass.set_vertex_buffer(0, vertices.slice());
                pass.set_index_buffer(indices.slice(), IndexBuffer::FORMAT);
                pass.draw_indexed(0..indices.count(), 0, 0..1);
            }
        }
        self.ctx.submit([encoder.finish()]);

        trace!(
            "encoded {} triangles into {:?}",
            mesh.triangle_count(),
            target
        );
        Ok(())
    }

    fn read_depth(&mut self, target: DepthTarget) -> Result<Vec<f32>, CoverageError> {
        let resources = self.resources.as_ref().ok_or(CoverageError::Disposed)?;
        let bytes = read_texture(
            &self.ctx,
            &resources.buffer(target).color,
            self.format.bytes_per_pixel(),
        )
        .map_err(CoverageError::Readback)?;
        Ok(self.format.decode(&bytes))
    }

    fn show_debug(&mut self, target: DepthTarget, image: &DebugImage) -> Result<(), CoverageError> {
        if self.resources.is_none() {
            return Err(CoverageError::Disposed);
        }
        let label = match target {
            DepthTarget::Occluder => "occluder depth debug view",
            DepthTarget::Panel => "panel depth debug view",
        };
        self.debug_views[slot(target)] = Some(Texture2D::from_rgba8(
            &self.ctx,
            image.width(),
            image.height(),
            &image.to_rgba8(),
            Some(label),
        ));
        Ok(())
    }

    fn hide_debug(&mut self) {
        self.debug_views = [None, None];
    }

    fn release(&mut self) {
        if self.resources.take().is_some() {
            debug!("released depth targets and encoders");
        }
        self.hide_debug();
    }

    fn is_released(&self) -> bool {
        self.resources.is_none()
    }
}

impl std::fmt::Debug for GpuDepthRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuDepthRenderer")
            .field("format", &self.format)
            .field("resolution", &self.resolution)
            .field("state", &self.state)
            .field("released", &self.resources.is_none())
            .finish()
    }
}
