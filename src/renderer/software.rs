//! CPU depth renderer
//!
//! A small edge-function rasterizer with the same contract as the GPU path:
//! pixel-center sampling, a `Less` depth test against a hidden z-buffer, and
//! linear depth quantized to the target format. It needs no device, which
//! makes it the renderer of choice for tests and benchmarks.

use super::camera::LightCamera;
use super::capability::TargetFormat;
use super::{DepthRenderer, DepthStrategy, DepthTarget, RenderState, SENTINEL_DEPTH};
use crate::error::CoverageError;
use crate::scene::BakedMesh;
use glam::{Vec2, Vec3};
use tracing::trace;

/// Below this a projected triangle has no area.
const AREA_EPSILON: f32 = 1e-12;

#[derive(Debug, Clone)]
struct Buffers {
    color: Vec<f32>,
    z: Vec<f32>,
}

impl Buffers {
    fn new(pixels: usize) -> Self {
        Self {
            color: vec![SENTINEL_DEPTH; pixels],
            z: vec![1.0; pixels],
        }
    }
}

/// Depth renderer that rasterizes on the CPU.
#[derive(Debug, Clone)]
pub struct SoftwareDepthRenderer {
    format: TargetFormat,
    resolution: u32,
    state: RenderState,
    targets: Option<[Buffers; 2]>,
    passes: usize,
    reads: usize,
}

impl SoftwareDepthRenderer {
    /// Full-float targets at `resolution` x `resolution`.
    pub fn new(resolution: u32) -> Self {
        let pixels = resolution as usize * resolution as usize;
        Self {
            format: TargetFormat::R32Float,
            resolution,
            state: RenderState::default(),
            targets: Some([Buffers::new(pixels), Buffers::new(pixels)]),
            passes: 0,
            reads: 0,
        }
    }

    /// Store depth with the precision of `format`.
    pub fn with_format(mut self, format: TargetFormat) -> Self {
        self.format = format;
        self
    }

    /// Number of passes rendered so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Number of buffers read back so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    fn to_pixel(&self, ndc: Vec3) -> Vec2 {
        let size = self.resolution as f32;
        Vec2::new((ndc.x + 1.0) * 0.5 * size, (1.0 - ndc.y) * 0.5 * size)
    }
}

fn slot(target: DepthTarget) -> usize {
    match target {
        DepthTarget::Occluder => 0,
        DepthTarget::Panel => 1,
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn keeps_fragment(strategy: &DepthStrategy, normal: Vec3) -> bool {
    match *strategy {
        DepthStrategy::AllGeometry => true,
        DepthStrategy::TopFace {
            normal: top,
            threshold,
        } => {
            let len = normal.length();
            len >= 1e-6 && (normal / len).dot(top) > threshold
        }
    }
}

impl DepthRenderer for SoftwareDepthRenderer {
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
        if self.targets.is_none() {
            return Err(CoverageError::Disposed);
        }
        let target = self.state.active_target.ok_or(CoverageError::NoActiveTarget)?;
        let state = self.state;
        let format = self.format;
        let size = self.resolution as usize;
        let view_proj = camera.view_projection();

        let projected: Vec<[(Vec2, f32, f32, Vec3); 3]> = mesh
            .triangles()
            .map(|tri| {
                tri.map(|v| {
                    let world = Vec3::from_array(v.position);
                    let ndc = view_proj.project_point3(world);
                    (
                        self.to_pixel(ndc),
                        ndc.z,
                        camera.view_depth(world),
                        Vec3::from_array(v.normal),
                    )
                })
            })
            .collect();

        let Some(targets) = self.targets.as_mut() else {
            return Err(CoverageError::Disposed);
        };
        let buffers = &mut targets[slot(target)];

        if state.auto_clear {
            if let Some(color) = state.clear.color {
                buffers.color.fill(color[0]);
            }
            if let Some(depth) = state.clear.depth {
                buffers.z.fill(depth);
            }
        }

        for [(p0, z0, d0, n0), (p1, z1, d1, n1), (p2, z2, d2, n2)] in projected {
            let area = edge(p0, p1, p2);
            if area.abs() < AREA_EPSILON || !area.is_finite() {
                continue;
            }

            let min = p0.min(p1).min(p2).floor().max(Vec2::ZERO);
            let max = p0.max(p1).max(p2).ceil().min(Vec2::splat(size as f32));
            if min.x >= max.x || min.y >= max.y {
                continue;
            }

            for y in min.y as usize..max.y as usize {
                for x in min.x as usize..max.x as usize {
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    // Dividing by the signed area makes both windings inside-positive.
                    let w0 = edge(p1, p2, p) / area;
                    let w1 = edge(p2, p0, p) / area;
                    let w2 = edge(p0, p1, p) / area;
                    if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                        continue;
                    }

                    let z = w0 * z0 + w1 * z1 + w2 * z2;
                    if !(0.0..=1.0).contains(&z) {
                        continue;
                    }
                    let index = y * size + x;
                    if z >= buffers.z[index] {
                        continue;
                    }
                    if !keeps_fragment(strategy, n0 * w0 + n1 * w1 + n2 * w2) {
                        continue;
                    }

                    let view_depth = w0 * d0 + w1 * d1 + w2 * d2;
                    buffers.z[index] = z;
                    buffers.color[index] = format.quantize(camera.encode_depth(view_depth));
                }
            }
        }

        self.passes += 1;
        trace!(
            "rasterized {} triangles into {:?}",
            mesh.triangle_count(),
            target
        );
        Ok(())
    }

    fn read_depth(&mut self, target: DepthTarget) -> Result<Vec<f32>, CoverageError> {
        let targets = self.targets.as_ref().ok_or(CoverageError::Disposed)?;
        self.reads += 1;
        Ok(targets[slot(target)].color.clone())
    }

    fn release(&mut self) {
        self.targets = None;
    }

    fn is_released(&self) -> bool {
        self.targets.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{FitPadding, SunLight};
    use crate::scene::{MeshData, Scene, SceneProvider, Transform};
    use std::sync::Arc;

    fn overhead_camera(bounds: &[crate::scene::Aabb]) -> LightCamera {
        let sun = SunLight::new(Vec3::NEG_Y, 1.0);
        LightCamera::fit(&sun, &bounds[0], &bounds[1..], FitPadding::default())
    }

    fn bake(scene: &Scene, id: crate::scene::NodeId) -> BakedMesh {
        BakedMesh::bake(&scene.renderable(id).unwrap())
    }

    fn covered(depths: &[f32]) -> usize {
        depths.iter().filter(|&&d| d < SENTINEL_DEPTH).count()
    }

    #[test]
    fn test_panel_fills_center() {
        let mut scene = Scene::new();
        let panel = scene.add_mesh(Arc::new(MeshData::panel(2.0, 2.0, 0.1)), Transform::identity());
        let mesh = bake(&scene, panel);
        let camera = overhead_camera(&[mesh.bounds()]);

        let mut renderer = SoftwareDepthRenderer::new(16);
        renderer.set_state(RenderState::depth_pass(DepthTarget::Panel));
        renderer.render(&DepthStrategy::AllGeometry, &camera, &mesh).unwrap();
        let depths = renderer.read_depth(DepthTarget::Panel).unwrap();

        assert_eq!(depths.len(), 256);
        assert!(depths[8 * 16 + 8] < SENTINEL_DEPTH);
        assert_eq!(depths[0], SENTINEL_DEPTH);
        assert!(covered(&depths) > 100);
        assert_eq!(renderer.passes(), 1);
        assert_eq!(renderer.reads(), 1);
    }

    #[test]
    fn test_nearer_geometry_wins() {
        let mut scene = Scene::new();
        let panel = scene.add_mesh(Arc::new(MeshData::panel(2.0, 2.0, 0.1)), Transform::identity());
        let roof = scene.add_mesh(
            Arc::new(MeshData::cuboid(Vec3::new(1.0, 0.1, 1.0))),
            Transform::from_position(Vec3::new(0.0, 2.0, 0.0)),
        );
        let panel_mesh = bake(&scene, panel);
        let roof_mesh = bake(&scene, roof);
        let camera = overhead_camera(&[panel_mesh.bounds(), roof_mesh.bounds()]);

        let mut renderer = SoftwareDepthRenderer::new(32);
        renderer.set_state(RenderState::depth_pass(DepthTarget::Panel));
        renderer.render(&DepthStrategy::AllGeometry, &camera, &panel_mesh).unwrap();
        renderer.set_state(RenderState::depth_pass(DepthTarget::Occluder));
        renderer.render(&DepthStrategy::AllGeometry, &camera, &roof_mesh).unwrap();

        let center = 16 * 32 + 16;
        let panel_depth = renderer.read_depth(DepthTarget::Panel).unwrap()[center];
        let roof_depth = renderer.read_depth(DepthTarget::Occluder).unwrap()[center];
        assert!(roof_depth < panel_depth);
    }

    #[test]
    fn test_top_face_discards_other_faces() {
        let mut scene = Scene::new();
        let panel = scene.add_mesh(Arc::new(MeshData::panel(2.0, 2.0, 0.1)), Transform::identity());
        let mesh = bake(&scene, panel);
        let camera = overhead_camera(&[mesh.bounds()]);
        let mut renderer = SoftwareDepthRenderer::new(16);
        renderer.set_state(RenderState::depth_pass(DepthTarget::Panel));

        let facing_up = DepthStrategy::TopFace {
            normal: Vec3::Y,
            threshold: 0.7,
        };
        renderer.render(&facing_up, &camera, &mesh).unwrap();
        let top = renderer.read_depth(DepthTarget::Panel).unwrap();
        assert!(covered(&top) > 100);

        let sideways = DepthStrategy::TopFace {
            normal: Vec3::X,
            threshold: 0.7,
        };
        renderer.render(&sideways, &camera, &mesh).unwrap();
        let side = renderer.read_depth(DepthTarget::Panel).unwrap();
        assert_eq!(covered(&side), 0);
    }

    #[test]
    fn test_empty_mesh_clears_to_sentinel() {
        let mut scene = Scene::new();
        let panel = scene.add_mesh(Arc::new(MeshData::panel(2.0, 2.0, 0.1)), Transform::identity());
        let mesh = bake(&scene, panel);
        let camera = overhead_camera(&[mesh.bounds()]);
        let mut renderer = SoftwareDepthRenderer::new(8);
        renderer.set_state(RenderState::depth_pass(DepthTarget::Occluder));

        renderer.render(&DepthStrategy::AllGeometry, &camera, &mesh).unwrap();
        assert!(covered(&renderer.read_depth(DepthTarget::Occluder).unwrap()) > 0);

        renderer
            .render(&DepthStrategy::AllGeometry, &camera, &BakedMesh::default())
            .unwrap();
        let depths = renderer.read_depth(DepthTarget::Occluder).unwrap();
        assert!(depths.iter().all(|&d| d == SENTINEL_DEPTH));
    }

    #[test]
    fn test_without_auto_clear_keeps_contents() {
        let mut scene = Scene::new();
        let panel = scene.add_mesh(Arc::new(MeshData::panel(2.0, 2.0, 0.1)), Transform::identity());
        let mesh = bake(&scene, panel);
        let camera = overhead_camera(&[mesh.bounds()]);
        let mut renderer = SoftwareDepthRenderer::new(8);
        renderer.set_state(RenderState::depth_pass(DepthTarget::Occluder));
        renderer.render(&DepthStrategy::AllGeometry, &camera, &mesh).unwrap();

        renderer.set_state(RenderState {
            auto_clear: false,
            ..RenderState::depth_pass(DepthTarget::Occluder)
        });
        renderer
            .render(&DepthStrategy::AllGeometry, &camera, &BakedMesh::default())
            .unwrap();
        assert!(covered(&renderer.read_depth(DepthTarget::Occluder).unwrap()) > 0);
    }

    #[test]
    fn test_requires_active_target() {
        let mut renderer = SoftwareDepthRenderer::new(4);
        let sun = SunLight::default();
        let panel = crate::scene::Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let camera = LightCamera::fit(&sun, &panel, &[], FitPadding::default());
        let result = renderer.render(&DepthStrategy::AllGeometry, &camera, &BakedMesh::default());
        assert!(matches!(result, Err(CoverageError::NoActiveTarget)));
    }

    #[test]
    fn test_reduced_precision_quantizes() {
        let mut scene = Scene::new();
        let panel = scene.add_mesh(Arc::new(MeshData::panel(2.0, 2.0, 0.1)), Transform::identity());
        let mesh = bake(&scene, panel);
        let camera = overhead_camera(&[mesh.bounds()]);
        let mut renderer = SoftwareDepthRenderer::new(8).with_format(TargetFormat::R8Unorm);
        renderer.set_state(RenderState::depth_pass(DepthTarget::Panel));
        renderer.render(&DepthStrategy::AllGeometry, &camera, &mesh).unwrap();

        for d in renderer.read_depth(DepthTarget::Panel).unwrap() {
            let steps = d * 255.0;
            assert!((steps - steps.round()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_released_renderer_fails() {
        let mut renderer = SoftwareDepthRenderer::new(4);
        renderer.release();
        assert!(renderer.is_released());
        assert!(matches!(
            renderer.read_depth(DepthTarget::Panel),
            Err(CoverageError::Disposed)
        ));
    }
}
