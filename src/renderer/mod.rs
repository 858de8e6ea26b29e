//! Depth rendering
//!
//! [`DepthRenderer`] is the seam between the coverage orchestration and the
//! thing that rasterizes: [`GpuDepthRenderer`] on wgpu, or
//! [`SoftwareDepthRenderer`] on the CPU.

mod camera;
mod capability;
mod debug;
mod encoder;
mod gpu;
mod light;
mod software;

pub use camera::{choose_up, FitPadding, LightCamera, NEAR_EPSILON};
pub use capability::{negotiate, FormatSupport, TargetFormat};
pub use debug::DebugImage;
pub use encoder::{DepthEncoder, EncoderUniform};
pub use gpu::GpuDepthRenderer;
pub use light::{SunLight, MIN_INTENSITY};
pub use software::SoftwareDepthRenderer;

use crate::core::ClearState;
use crate::error::CoverageError;
use crate::scene::BakedMesh;
use glam::Vec3;
use std::ops::{Deref, DerefMut};

/// Normalized depth meaning "no surface here".
pub const SENTINEL_DEPTH: f32 = 1.0;

/// One of the two off-screen depth buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthTarget {
    /// Depth of every occluder.
    Occluder,
    /// Depth of the panel's top face only.
    Panel,
}

/// How fragments are encoded into a depth target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthStrategy {
    /// Every fragment writes its depth; nearest wins.
    AllGeometry,
    /// Only fragments whose world normal is within `threshold` (cosine) of
    /// `normal` write their depth.
    TopFace { normal: Vec3, threshold: f32 },
}

/// Renderer state a computation overrides and must hand back untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Target subsequent passes draw into.
    pub active_target: Option<DepthTarget>,
    /// Values used to clear the target before a pass.
    pub clear: ClearState,
    /// Whether a pass clears its target first.
    pub auto_clear: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            active_target: None,
            clear: ClearState::default(),
            auto_clear: true,
        }
    }
}

impl RenderState {
    /// State for a depth-encoding pass into `target`.
    pub fn depth_pass(target: DepthTarget) -> Self {
        Self {
            active_target: Some(target),
            clear: ClearState::splat(SENTINEL_DEPTH),
            auto_clear: true,
        }
    }
}

/// Off-screen rasterizer producing encoded depth.
pub trait DepthRenderer {
    /// Pixel format of both targets.
    fn format(&self) -> TargetFormat;

    /// Side length of both (square) targets.
    fn resolution(&self) -> u32;

    /// Current mutable state.
    fn state(&self) -> RenderState;

    /// Replace the mutable state.
    fn set_state(&mut self, state: RenderState);

    /// Rasterize `mesh` into the active target.
    fn render(
        &mut self,
        strategy: &DepthStrategy,
        camera: &LightCamera,
        mesh: &BakedMesh,
    ) -> Result<(), CoverageError>;

    /// Read a whole target back, one normalized depth per pixel, rows top to
    /// bottom.
    fn read_depth(&mut self, target: DepthTarget) -> Result<Vec<f32>, CoverageError>;

    /// Mirror a depth buffer on a debug surface.
    fn show_debug(&mut self, _target: DepthTarget, _image: &DebugImage) -> Result<(), CoverageError> {
        Ok(())
    }

    /// Detach any debug surfaces.
    fn hide_debug(&mut self) {}

    /// Release targets and programs. Later passes fail with
    /// [`CoverageError::Disposed`].
    fn release(&mut self);

    /// Whether [`Self::release`] was called.
    fn is_released(&self) -> bool;
}

/// Restores a renderer's state when dropped, on success and error paths alike.
pub struct StateGuard<'a, R: DepthRenderer + ?Sized> {
    renderer: &'a mut R,
    saved: RenderState,
}

impl<'a, R: DepthRenderer + ?Sized> StateGuard<'a, R> {
    /// Snapshot the renderer's state.
    pub fn new(renderer: &'a mut R) -> Self {
        let saved = renderer.state();
        Self { renderer, saved }
    }

    /// The state that will be restored.
    pub fn saved(&self) -> RenderState {
        self.saved
    }
}

impl<R: DepthRenderer + ?Sized> Deref for StateGuard<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.renderer
    }
}

impl<R: DepthRenderer + ?Sized> DerefMut for StateGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.renderer
    }
}

impl<R: DepthRenderer + ?Sized> Drop for StateGuard<'_, R> {
    fn drop(&mut self) {
        self.renderer.set_state(self.saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_state() {
        let mut renderer = SoftwareDepthRenderer::new(8);
        let custom = RenderState {
            active_target: None,
            clear: ClearState::color([0.2, 0.3, 0.4, 0.5]),
            auto_clear: false,
        };
        renderer.set_state(custom);

        {
            let mut guard = StateGuard::new(&mut renderer);
            guard.set_state(RenderState::depth_pass(DepthTarget::Panel));
            assert_eq!(guard.state().active_target, Some(DepthTarget::Panel));
            assert_eq!(guard.saved(), custom);
        }

        assert_eq!(renderer.state(), custom);
    }

    #[test]
    fn test_guard_restores_on_error_path() {
        fn failing(renderer: &mut SoftwareDepthRenderer) -> Result<(), CoverageError> {
            let mut guard = StateGuard::new(renderer);
            guard.set_state(RenderState::depth_pass(DepthTarget::Occluder));
            guard.release();
            guard.read_depth(DepthTarget::Occluder)?;
            Ok(())
        }

        let mut renderer = SoftwareDepthRenderer::new(8);
        let before = renderer.state();
        assert!(matches!(failing(&mut renderer), Err(CoverageError::Disposed)));
        assert_eq!(renderer.state(), before);
    }
}
