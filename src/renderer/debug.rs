//! Grayscale debug images of the depth buffers.

/// An 8-bit grayscale snapshot of one depth buffer.
///
/// Near surfaces are dark, the empty sentinel is white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DebugImage {
    /// Build an image from a square buffer of normalized depths.
    pub fn from_depth(depths: &[f32], size: u32) -> Self {
        let pixels = depths
            .iter()
            .map(|d| (d.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// One byte per pixel, rows top to bottom.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Expand to opaque RGBA8 for upload.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|&g| [g, g, g, 255]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_depth() {
        let image = DebugImage::from_depth(&[0.0, 0.5, 1.0, 2.0], 2);
        assert_eq!(image.pixels(), &[0, 128, 255, 255]);
        assert_eq!(image.to_rgba8()[4..8], [128, 128, 128, 255]);
        assert_eq!((image.width(), image.height()), (2, 2));
    }
}
