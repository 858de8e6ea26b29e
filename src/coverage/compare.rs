//! Depth buffer comparison

use crate::error::CoverageError;
use crate::renderer::TargetFormat;

/// Panel depths at or above this are treated as empty.
pub const SENTINEL_THRESHOLD: f32 = 0.9999;

/// Pixel counts produced by one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelTally {
    /// Pixels where the panel's top face is visible.
    pub total: u64,
    /// Panel pixels with an occluder in front of them.
    pub shadowed: u64,
}

impl PixelTally {
    /// Shadowed share in percent, rounded to two decimals. Zero when the
    /// panel covers no pixel.
    pub fn percent(&self) -> f64 {
        coverage_percent(self.shadowed, self.total)
    }
}

/// Count panel pixels and the ones an occluder sits in front of.
///
/// A pixel is shadowed when `occluder <= panel - epsilon`.
pub fn compare_depths(
    panel: &[f32],
    occluder: &[f32],
    epsilon: f32,
) -> Result<PixelTally, CoverageError> {
    if panel.len() != occluder.len() {
        return Err(CoverageError::BufferMismatch {
            panel: panel.len(),
            occluder: occluder.len(),
        });
    }

    let mut tally = PixelTally::default();
    for (&p, &o) in panel.iter().zip(occluder) {
        if p >= SENTINEL_THRESHOLD {
            continue;
        }
        tally.total += 1;
        if o <= p - epsilon {
            tally.shadowed += 1;
        }
    }
    Ok(tally)
}

/// Depth margin used against buffers stored in `format`.
///
/// Never below half a quantization step: equal stored depths are never
/// shadowed and depths one step apart always are.
pub fn comparison_epsilon(configured: f32, format: TargetFormat) -> f32 {
    configured.max(0.5 * format.quantum())
}

/// `100 * shadowed / total` rounded to two decimals, or 0 for an empty panel.
pub fn coverage_percent(shadowed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(100.0 * shadowed as f64 / total as f64)
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
