//! Sun-aligned orthographic camera
//!
//! Refitted on every computation: the camera sits up-sun of the panel, looks
//! at the panel's center, and its box is the tightest one (plus padding) that
//! holds the panel and every occluder.

use super::light::SunLight;
use crate::scene::Aabb;
use glam::{Mat4, Vec3};
use tracing::{debug, warn};

/// Smallest allowed near plane distance and depth range.
pub const NEAR_EPSILON: f32 = 1e-3;

/// Below this the light direction counts as parallel to +Y.
const PARALLEL_EPSILON: f32 = 1e-6;

/// Padding added around the fitted volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPadding {
    /// Added on the left/right/top/bottom extents, in world units.
    pub lateral: f32,
    /// Added before the nearest and after the farthest point, in world units.
    pub depth: f32,
}

impl Default for FitPadding {
    fn default() -> Self {
        Self {
            lateral: 0.25,
            depth: 0.5,
        }
    }
}

/// Orthographic light camera fitted to a panel and its occluders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl LightCamera {
    /// Fit a camera looking along `light.direction` at the panel center.
    ///
    /// `light.direction` must be non-zero; dark lights never reach the fitter.
    pub fn fit(light: &SunLight, panel: &Aabb, occluders: &[Aabb], padding: FitPadding) -> Self {
        let direction = light.direction;
        let target = panel.center();

        let mut bounds = *panel;
        for occluder in occluders.iter().filter(|b| b.is_valid()) {
            bounds = bounds.merge(occluder);
        }

        // Stand back further than any corner can be from the target so all
        // geometry lands in front of the camera.
        let standoff = (bounds.max - target)
            .abs()
            .max((bounds.min - target).abs())
            .length()
            + padding.depth
            + 1.0;
        let eye = target - direction * standoff;
        let up = choose_up(direction);
        let view = Mat4::look_at_rh(eye, target, up);

        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for aabb in std::iter::once(panel).chain(occluders.iter().filter(|b| b.is_valid())) {
            for corner in aabb.corners() {
                let p = view.transform_point3(corner);
                min = min.min(p);
                max = max.max(p);
            }
        }

        // Right-handed view space looks down -Z.
        let left = min.x - padding.lateral;
        let right = max.x + padding.lateral;
        let bottom = min.y - padding.lateral;
        let top = max.y + padding.lateral;
        let near = (-max.z - padding.depth).max(NEAR_EPSILON);
        let far = (-min.z + padding.depth).max(near + NEAR_EPSILON);

        let projection = Mat4::orthographic_rh(left, right, bottom, top, near, far);

        debug!(
            "light camera fitted: x [{left:.3}, {right:.3}] y [{bottom:.3}, {top:.3}] depth [{near:.3}, {far:.3}]"
        );

        Self {
            eye,
            target,
            up,
            view,
            projection,
            left,
            right,
            bottom,
            top,
            near,
            far,
        }
    }

    /// World to clip space.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Distance in front of the camera along its view axis.
    pub fn view_depth(&self, world: Vec3) -> f32 {
        -self.view.transform_point3(world).z
    }

    /// Linear depth mapped to `[0, 1]` between the near and far planes.
    pub fn encode_depth(&self, view_depth: f32) -> f32 {
        ((view_depth - self.near) / (self.far - self.near)).clamp(0.0, 1.0)
    }
}

/// +Y unless the light runs (anti)parallel to it, in which case +Z.
pub fn choose_up(direction: Vec3) -> Vec3 {
    if direction.cross(Vec3::Y).length_squared() <= PARALLEL_EPSILON {
        warn!("light direction is parallel to +Y, orienting the light camera with +Z up");
        Vec3::Z
    } else {
        Vec3::Y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box_at(center: Vec3) -> Aabb {
        Aabb::new(center - Vec3::splat(0.5), center + Vec3::splat(0.5))
    }

    #[test]
    fn test_fit_bounds_panel_with_padding() {
        let sun = SunLight::new(Vec3::new(0.3, -1.0, 0.2), 1.0);
        let panel = unit_box_at(Vec3::ZERO);
        let cam = LightCamera::fit(&sun, &panel, &[], FitPadding::default());

        for corner in panel.corners() {
            let p = cam.view.transform_point3(corner);
            assert!(p.x >= cam.left + 0.25 - 1e-4 && p.x <= cam.right - 0.25 + 1e-4);
            assert!(p.y >= cam.bottom + 0.25 - 1e-4 && p.y <= cam.top - 0.25 + 1e-4);
            let d = -p.z;
            assert!(d >= cam.near + 0.5 - 1e-3 && d <= cam.far - 0.5 + 1e-3);
        }
        assert!(cam.near >= NEAR_EPSILON);
        assert!(cam.far > cam.near);
    }

    #[test]
    fn test_fit_includes_occluders() {
        let sun = SunLight::new(Vec3::NEG_Y + Vec3::X * 0.1, 1.0);
        let panel = unit_box_at(Vec3::ZERO);
        let wall = unit_box_at(Vec3::new(6.0, 2.0, 0.0));
        let with = LightCamera::fit(&sun, &panel, &[wall], FitPadding::default());
        let without = LightCamera::fit(&sun, &panel, &[], FitPadding::default());

        assert!(with.right - with.left > without.right - without.left);
        let ndc = with.view_projection().project_point3(wall.center());
        assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn test_camera_looks_at_panel_center() {
        let sun = SunLight::from_azimuth_elevation(135.0, 35.0, 1.0);
        let panel = unit_box_at(Vec3::new(4.0, 1.0, -2.0));
        let cam = LightCamera::fit(&sun, &panel, &[], FitPadding::default());

        assert_eq!(cam.target, panel.center());
        let forward = (cam.target - cam.eye).normalize();
        assert!((forward - sun.direction).length() < 1e-5);
    }

    #[test]
    fn test_overhead_sun_uses_fallback_up() {
        let sun = SunLight::new(Vec3::NEG_Y, 1.0);
        assert_eq!(choose_up(sun.direction), Vec3::Z);
        assert_eq!(choose_up(Vec3::new(0.5, -1.0, 0.0).normalize()), Vec3::Y);

        let cam = LightCamera::fit(&sun, &unit_box_at(Vec3::ZERO), &[], FitPadding::default());
        assert!(cam.view.is_finite());
        assert!(cam.right - cam.left > 1.0);
    }

    #[test]
    fn test_encode_depth_clamps() {
        let sun = SunLight::new(Vec3::NEG_Y + Vec3::Z * 0.2, 1.0);
        let cam = LightCamera::fit(&sun, &unit_box_at(Vec3::ZERO), &[], FitPadding::default());
        assert_eq!(cam.encode_depth(cam.near - 10.0), 0.0);
        assert_eq!(cam.encode_depth(cam.far + 10.0), 1.0);
        let mid = cam.encode_depth((cam.near + cam.far) * 0.5);
        assert!((mid - 0.5).abs() < 1e-5);
    }
}
