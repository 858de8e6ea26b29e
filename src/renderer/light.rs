//! Sun light
//!
//! The only light the coverage core understands: an infinitely distant
//! directional light.

use glam::Vec3;

/// Below this intensity the sun is treated as switched off.
pub const MIN_INTENSITY: f32 = 1e-6;

/// Directional light standing in for the sun.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunLight {
    /// Direction the light travels (from the sun toward the scene), normalized.
    /// Zero when constructed from a degenerate vector.
    pub direction: Vec3,
    /// Light intensity; zero means night.
    pub intensity: f32,
}

impl SunLight {
    /// Create a sun from the direction its light travels.
    pub fn new(direction: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            intensity,
        }
    }

    /// Create a sun placed at `position` shining at `target`.
    pub fn from_position(position: Vec3, target: Vec3, intensity: f32) -> Self {
        Self::new(target - position, intensity)
    }

    /// Create a sun from compass azimuth and elevation, both in degrees.
    ///
    /// Azimuth is measured from -Z (north) toward +X (east); elevation from
    /// the horizon toward +Y.
    pub fn from_azimuth_elevation(azimuth_deg: f32, elevation_deg: f32, intensity: f32) -> Self {
        let (az_sin, az_cos) = azimuth_deg.to_radians().sin_cos();
        let (el_sin, el_cos) = elevation_deg.to_radians().sin_cos();
        let toward_sun = Vec3::new(el_cos * az_sin, el_sin, -el_cos * az_cos);
        Self::new(-toward_sun, intensity)
    }

    /// Unit vector pointing from the scene toward the sun.
    pub fn toward_sun(&self) -> Vec3 {
        -self.direction
    }

    /// Angle of the sun above the horizon, in degrees.
    pub fn elevation(&self) -> f32 {
        self.toward_sun().y.clamp(-1.0, 1.0).asin().to_degrees()
    }

    /// Whether the sun is on or below the horizon.
    pub fn is_below_horizon(&self) -> bool {
        self.toward_sun().y <= 0.0
    }

    /// Whether no direct light reaches the scene at all.
    pub fn is_dark(&self) -> bool {
        self.intensity <= MIN_INTENSITY || self.is_below_horizon()
    }
}

impl Default for SunLight {
    fn default() -> Self {
        Self::from_azimuth_elevation(180.0, 45.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_is_normalized() {
        let sun = SunLight::new(Vec3::new(0.0, -4.0, 3.0), 1.0);
        assert!((sun.direction.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_position_points_at_target() {
        let sun = SunLight::from_position(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, 1.0);
        assert_eq!(sun.direction, Vec3::NEG_Y);
        assert!((sun.elevation() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_azimuth_elevation() {
        let south = SunLight::from_azimuth_elevation(180.0, 30.0, 1.0);
        assert!((south.elevation() - 30.0).abs() < 1e-3);
        // Southern sun shines toward the north (-Z).
        assert!(south.direction.z < 0.0);
        assert!(south.direction.y < 0.0);

        let east = SunLight::from_azimuth_elevation(90.0, 10.0, 1.0);
        assert!(east.toward_sun().x > 0.9);
    }

    #[test]
    fn test_dark_states() {
        assert!(SunLight::from_azimuth_elevation(0.0, -5.0, 1.0).is_dark());
        assert!(SunLight::from_azimuth_elevation(0.0, 0.0, 1.0).is_below_horizon());
        assert!(SunLight::from_azimuth_elevation(0.0, 40.0, 0.0).is_dark());
        assert!(SunLight::new(Vec3::ZERO, 1.0).is_dark());
        assert!(!SunLight::default().is_dark());
    }
}
