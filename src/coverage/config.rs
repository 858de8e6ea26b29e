//! Coverage settings
//!
//! Configuration for a [`CoverageCalculator`](super::CoverageCalculator).

use crate::error::CoverageError;
use crate::renderer::FitPadding;
use std::time::Duration;

/// Upper bound on the render target side accepted before asking the device.
pub const MAX_RESOLUTION: u32 = 16384;

/// Settings for a coverage calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageConfig {
    /// Side length of both square depth targets.
    pub resolution: u32,
    /// Depth margin an occluder must clear to count as shadowing.
    pub epsilon: f32,
    /// Maximum age of a cached result. Zero never expires.
    pub cache_ttl: Duration,
    /// Produce grayscale images of both depth buffers.
    pub debug: bool,
    /// Cosine a panel fragment's normal must exceed to count as top face.
    pub top_face_threshold: f32,
    /// Lateral frustum padding in world units.
    pub lateral_padding: f32,
    /// Near/far frustum padding in world units.
    pub depth_padding: f32,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            resolution: 4096,
            epsilon: 1e-4,
            cache_ttl: Duration::from_millis(5000),
            debug: false,
            top_face_threshold: 0.7,
            lateral_padding: 0.25,
            depth_padding: 0.5,
        }
    }
}

impl CoverageConfig {
    /// Create new settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the depth target resolution.
    pub fn resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the comparison epsilon.
    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the cache TTL.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the cache TTL in milliseconds.
    pub fn cache_ttl_ms(self, ttl_ms: u64) -> Self {
        self.cache_ttl(Duration::from_millis(ttl_ms))
    }

    /// Set whether to produce debug images.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the top-face cosine threshold.
    pub fn top_face_threshold(mut self, threshold: f32) -> Self {
        self.top_face_threshold = threshold;
        self
    }

    /// Set both frustum paddings.
    pub fn padding(mut self, lateral: f32, depth: f32) -> Self {
        self.lateral_padding = lateral;
        self.depth_padding = depth;
        self
    }

    /// Frustum padding for the camera fitter.
    pub fn fit_padding(&self) -> FitPadding {
        FitPadding {
            lateral: self.lateral_padding,
            depth: self.depth_padding,
        }
    }

    /// Reject settings no computation can run with.
    pub fn validate(&self) -> Result<(), CoverageError> {
        if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
            return Err(CoverageError::InvalidConfig(format!(
                "resolution must be in 1..={MAX_RESOLUTION}, got {}",
                self.resolution
            )));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(CoverageError::InvalidConfig(format!(
                "epsilon must be finite and non-negative, got {}",
                self.epsilon
            )));
        }
        if !(-1.0..=1.0).contains(&self.top_face_threshold) {
            return Err(CoverageError::InvalidConfig(format!(
                "top face threshold must be in [-1, 1], got {}",
                self.top_face_threshold
            )));
        }
        for (name, value) in [
            ("lateral padding", self.lateral_padding),
            ("depth padding", self.depth_padding),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoverageError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoverageConfig::default();
        assert_eq!(config.resolution, 4096);
        assert_eq!(config.epsilon, 1e-4);
        assert_eq!(config.cache_ttl, Duration::from_millis(5000));
        assert!(!config.debug);
        assert_eq!(config.fit_padding(), FitPadding::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CoverageConfig::new()
            .resolution(256)
            .epsilon(1e-3)
            .cache_ttl_ms(0)
            .debug(true)
            .padding(0.5, 1.0);
        assert_eq!(config.resolution, 256);
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert!(config.debug);
        assert_eq!(config.fit_padding().depth, 1.0);
    }

    #[test]
    fn test_validate_rejects() {
        let bad = [
            CoverageConfig::new().resolution(0),
            CoverageConfig::new().resolution(MAX_RESOLUTION + 1),
            CoverageConfig::new().epsilon(-1.0),
            CoverageConfig::new().epsilon(f32::NAN),
            CoverageConfig::new().top_face_threshold(1.5),
            CoverageConfig::new().padding(-0.1, 0.5),
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(CoverageError::InvalidConfig(_))
            ));
        }
    }
}
