//! Shadow coverage of a panel
//!
//! [`CoverageCalculator`] answers one question: what share of a panel's
//! sun-facing surface is in shadow right now. It renders every occluder and the
//! panel's top face into two depth buffers from the sun's point of view,
//! compares them pixel by pixel, and caches the answer per panel.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sunshade::prelude::*;
//!
//! # fn main() -> Result<(), CoverageError> {
//! let mut scene = Scene::new();
//! let panel = scene.add_mesh(Arc::new(MeshData::panel(1.6, 1.0, 0.04)), Transform::identity());
//! let sun = SunLight::from_azimuth_elevation(200.0, 35.0, 1.0);
//!
//! let ctx = WgpuContext::new_blocking()?;
//! let mut calculator = CoverageCalculator::gpu(ctx, CoverageConfig::default())?;
//! let result = calculator.compute_coverage_blocking(&scene, &sun, panel)?;
//! println!("{:.2}% shaded", result.percent);
//! # Ok(())
//! # }
//! ```

mod cache;
mod compare;
mod config;

pub use cache::{Clock, CoverageCache, SystemClock};
pub use compare::{
    compare_depths, comparison_epsilon, coverage_percent, round2, PixelTally, SENTINEL_THRESHOLD,
};
pub use config::{CoverageConfig, MAX_RESOLUTION};

use crate::context::WgpuContext;
use crate::error::CoverageError;
use crate::renderer::{
    DebugImage, DepthRenderer, DepthStrategy, DepthTarget, GpuDepthRenderer, LightCamera,
    RenderState, StateGuard, SunLight, TargetFormat,
};
use crate::scene::{local_up, top_face_normal, BakedMesh, NodeId, SceneProvider};
use std::time::Instant;
use tracing::{debug, warn};

/// Outcome of one coverage computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageResult {
    /// Shadowed share of the panel's top face, 0 to 100, two decimals.
    pub percent: f64,
    /// Pixels the panel's top face covers.
    pub total_pixels: u64,
    /// Covered pixels with an occluder in front of them.
    pub shadowed_pixels: u64,
    /// When the result was produced.
    pub timestamp: Instant,
    /// Precision of the depth targets.
    pub format: TargetFormat,
    /// The sun was down or dark; no pass ran.
    pub sun_down: bool,
}

impl CoverageResult {
    fn sun_down(format: TargetFormat, timestamp: Instant) -> Self {
        Self {
            percent: 100.0,
            total_pixels: 1,
            shadowed_pixels: 1,
            timestamp,
            format,
            sun_down: true,
        }
    }

    fn from_tally(tally: PixelTally, format: TargetFormat, timestamp: Instant) -> Self {
        Self {
            percent: tally.percent(),
            total_pixels: tally.total,
            shadowed_pixels: tally.shadowed,
            timestamp,
            format,
            sun_down: false,
        }
    }

    /// Covered pixels in full sun.
    pub fn lit_pixels(&self) -> u64 {
        self.total_pixels - self.shadowed_pixels
    }

    /// Whether the result came from 8-bit depth and is only indicative.
    pub fn is_advisory(&self) -> bool {
        !self.format.is_float()
    }
}

/// Computes and caches panel shadow coverage.
pub struct CoverageCalculator<R: DepthRenderer = GpuDepthRenderer> {
    renderer: R,
    config: CoverageConfig,
    cache: CoverageCache,
    clock: Box<dyn Clock>,
    debug_images: [Option<DebugImage>; 2],
}

impl CoverageCalculator<GpuDepthRenderer> {
    /// Allocate GPU depth targets on `ctx` and wrap them in a calculator.
    pub fn gpu(ctx: WgpuContext, config: CoverageConfig) -> Result<Self, CoverageError> {
        config.validate()?;
        let renderer = GpuDepthRenderer::new(ctx, config.resolution)?;
        Self::new(renderer, config)
    }
}

impl<R: DepthRenderer> CoverageCalculator<R> {
    /// Wrap an existing renderer. Its resolution must match the config.
    pub fn new(renderer: R, config: CoverageConfig) -> Result<Self, CoverageError> {
        config.validate()?;
        if renderer.resolution() != config.resolution {
            return Err(CoverageError::InvalidConfig(format!(
                "renderer resolution {} does not match configured {}",
                renderer.resolution(),
                config.resolution
            )));
        }
        Ok(Self {
            cache: CoverageCache::new(config.cache_ttl),
            renderer,
            config,
            clock: Box::new(SystemClock),
            debug_images: [None, None],
        })
    }

    /// Measure cache age with `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Shadowed share of `panel`'s top face under `light`.
    ///
    /// A dark or set sun always yields the fully shaded result. Otherwise the
    /// cached result is returned when one is younger than the TTL. The future
    /// completes on its first poll.
    pub async fn compute_coverage<S: SceneProvider + ?Sized>(
        &mut self,
        scene: &S,
        light: &SunLight,
        panel: NodeId,
    ) -> Result<CoverageResult, CoverageError> {
        self.compute(scene, light, panel)
    }

    /// [`Self::compute_coverage`] driven to completion on this thread.
    pub fn compute_coverage_blocking<S: SceneProvider + ?Sized>(
        &mut self,
        scene: &S,
        light: &SunLight,
        panel: NodeId,
    ) -> Result<CoverageResult, CoverageError> {
        pollster::block_on(self.compute_coverage(scene, light, panel))
    }

    fn compute<S: SceneProvider + ?Sized>(
        &mut self,
        scene: &S,
        light: &SunLight,
        panel: NodeId,
    ) -> Result<CoverageResult, CoverageError> {
        if self.renderer.is_released() {
            return Err(CoverageError::Disposed);
        }

        let format = self.renderer.format();

        // The cache is keyed by panel only, so the sun's state decides first.
        if light.is_dark() {
            debug!(
                "sun is down (elevation {:.1}°, intensity {}), {panel:?} fully shaded",
                light.elevation(),
                light.intensity
            );
            let result = CoverageResult::sun_down(format, self.clock.now());
            self.cache.insert(panel, result);
            return Ok(result);
        }

        match self.cache.get(panel, self.clock.now()) {
            Some(hit) if !hit.sun_down => {
                debug!("coverage cache hit for {panel:?}");
                return Ok(hit);
            }
            _ => debug!("coverage cache miss for {panel:?}"),
        }

        let panel_node = scene
            .renderable(panel)
            .ok_or(CoverageError::PanelNotFound(panel))?;
        let panel_mesh = BakedMesh::bake(&panel_node);
        if panel_mesh.is_empty() {
            debug!("{panel:?} has no triangles, reporting no coverage");
            let result =
                CoverageResult::from_tally(PixelTally::default(), format, self.clock.now());
            self.cache.insert(panel, result);
            return Ok(result);
        }

        let occluders: Vec<_> = scene
            .shadow_casters()
            .into_iter()
            .filter(|r| r.id != panel)
            .collect();
        let occluder_bounds: Vec<_> = occluders.iter().map(|r| r.world_aabb()).collect();
        let occluder_mesh = BakedMesh::flatten(&occluders);

        let camera = LightCamera::fit(
            light,
            &panel_mesh.bounds(),
            &occluder_bounds,
            self.config.fit_padding(),
        );

        let top_face = DepthStrategy::TopFace {
            normal: top_face_normal(&panel_node).unwrap_or_else(|| local_up(&panel_node.world)),
            threshold: self.config.top_face_threshold,
        };

        let (panel_depths, occluder_depths) = {
            let mut guard = StateGuard::new(&mut self.renderer);

            guard.set_state(RenderState::depth_pass(DepthTarget::Occluder));
            guard.render(&DepthStrategy::AllGeometry, &camera, &occluder_mesh)?;

            guard.set_state(RenderState::depth_pass(DepthTarget::Panel));
            guard.render(&top_face, &camera, &panel_mesh)?;

            (
                guard.read_depth(DepthTarget::Panel)?,
                guard.read_depth(DepthTarget::Occluder)?,
            )
        };

        let epsilon = comparison_epsilon(self.config.epsilon, format);
        let tally = compare_depths(&panel_depths, &occluder_depths, epsilon)?;
        debug!(
            "{panel:?}: {} of {} pixels shadowed against {} occluders (epsilon {epsilon})",
            tally.shadowed,
            tally.total,
            occluders.len()
        );

        let result = CoverageResult::from_tally(tally, format, self.clock.now());
        self.cache.insert(panel, result);

        if self.config.debug {
            if let Err(err) = self.show_debug(&occluder_depths, &panel_depths) {
                warn!("failed to update depth debug views: {err}");
            }
        }
        Ok(result)
    }

    fn show_debug(&mut self, occluder: &[f32], panel: &[f32]) -> Result<(), CoverageError> {
        let size = self.renderer.resolution();
        let occluder = DebugImage::from_depth(occluder, size);
        let panel = DebugImage::from_depth(panel, size);
        self.renderer.show_debug(DepthTarget::Occluder, &occluder)?;
        self.renderer.show_debug(DepthTarget::Panel, &panel)?;
        self.debug_images = [Some(occluder), Some(panel)];
        Ok(())
    }

    /// The cached result for `panel`, if still fresh. Never renders.
    pub fn cached_coverage(&self, panel: NodeId) -> Option<CoverageResult> {
        self.cache.get(panel, self.clock.now())
    }

    /// Forget the result for `panel`, or every result when `None`.
    pub fn invalidate(&mut self, panel: Option<NodeId>) {
        self.cache.invalidate(panel);
    }

    /// Drop cached results older than the TTL.
    pub fn purge_expired(&mut self) -> usize {
        self.cache.purge_expired(self.clock.now())
    }

    /// Release the depth targets and encoders and detach debug surfaces.
    ///
    /// Later computations fail with [`CoverageError::Disposed`].
    pub fn dispose(&mut self) {
        self.renderer.hide_debug();
        self.renderer.release();
        self.debug_images = [None, None];
        self.cache.invalidate(None);
    }

    /// Whether [`Self::dispose`] was called.
    pub fn is_disposed(&self) -> bool {
        self.renderer.is_released()
    }

    /// The latest grayscale image of `target`, when debug output is enabled.
    pub fn debug_image(&self, target: DepthTarget) -> Option<&DebugImage> {
        match target {
            DepthTarget::Occluder => self.debug_images[0].as_ref(),
            DepthTarget::Panel => self.debug_images[1].as_ref(),
        }
    }

    /// The renderer passes are issued to.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Active settings.
    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// The result cache.
    pub fn cache(&self) -> &CoverageCache {
        &self.cache
    }
}

impl<R: DepthRenderer + std::fmt::Debug> std::fmt::Debug for CoverageCalculator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageCalculator")
            .field("renderer", &self.renderer)
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish()
    }
}
