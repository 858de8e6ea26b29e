//! Render-target format negotiation
//!
//! Depth is stored in a single color channel. The best format the device can
//! both render to and copy out of is chosen once, and both targets share it.

use crate::context::WgpuContext;
use tracing::{info, warn};

/// Pixel format of the depth render targets, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    /// 32-bit float.
    R32Float,
    /// 16-bit half float.
    R16Float,
    /// 8-bit normalized integer. Results are advisory only.
    R8Unorm,
}

impl TargetFormat {
    /// Negotiation order.
    pub const PREFERENCE: [TargetFormat; 3] = [
        TargetFormat::R32Float,
        TargetFormat::R16Float,
        TargetFormat::R8Unorm,
    ];

    /// The matching wgpu format.
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TargetFormat::R32Float => wgpu::TextureFormat::R32Float,
            TargetFormat::R16Float => wgpu::TextureFormat::R16Float,
            TargetFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
        }
    }

    /// Bytes per texel.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TargetFormat::R32Float => 4,
            TargetFormat::R16Float => 2,
            TargetFormat::R8Unorm => 1,
        }
    }

    /// Worst-case step between representable values in `[0, 1]`.
    pub fn quantum(self) -> f32 {
        match self {
            TargetFormat::R32Float => f32::EPSILON,
            // Half floats have 10 mantissa bits; spacing just below 1.0 is 2^-11.
            TargetFormat::R16Float => 1.0 / 2048.0,
            TargetFormat::R8Unorm => 1.0 / 255.0,
        }
    }

    /// Whether the format stores floating point values.
    pub fn is_float(self) -> bool {
        !matches!(self, TargetFormat::R8Unorm)
    }

    /// Round a normalized depth to what this format would store.
    pub fn quantize(self, value: f32) -> f32 {
        match self {
            TargetFormat::R32Float => value,
            TargetFormat::R16Float => half::f16::from_f32(value).to_f32(),
            TargetFormat::R8Unorm => (value.clamp(0.0, 1.0) * 255.0).round() / 255.0,
        }
    }

    /// Decode tightly packed texels into floats.
    pub fn decode(self, bytes: &[u8]) -> Vec<f32> {
        match self {
            TargetFormat::R32Float => bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            TargetFormat::R16Float => bytes
                .chunks_exact(2)
                .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
                .collect(),
            TargetFormat::R8Unorm => bytes.iter().map(|&b| b as f32 / 255.0).collect(),
        }
    }
}

/// Something that can tell which formats are usable as depth targets.
pub trait FormatSupport {
    /// Whether `format` can be rendered to and copied back to the host.
    fn supports_depth_target(&self, format: wgpu::TextureFormat) -> bool;
}

const REQUIRED_USAGES: wgpu::TextureUsages =
    wgpu::TextureUsages::RENDER_ATTACHMENT.union(wgpu::TextureUsages::COPY_SRC);

impl FormatSupport for wgpu::Adapter {
    fn supports_depth_target(&self, format: wgpu::TextureFormat) -> bool {
        self.get_texture_format_features(format)
            .allowed_usages
            .contains(REQUIRED_USAGES)
    }
}

impl FormatSupport for WgpuContext {
    fn supports_depth_target(&self, format: wgpu::TextureFormat) -> bool {
        match &self.adapter {
            Some(adapter) => adapter.supports_depth_target(format),
            None => format
                .guaranteed_format_features(self.device.features())
                .allowed_usages
                .contains(REQUIRED_USAGES),
        }
    }
}

/// Pick the most precise supported format, falling back to 8-bit.
pub fn negotiate(support: &impl FormatSupport) -> TargetFormat {
    let format = TargetFormat::PREFERENCE
        .into_iter()
        .find(|f| support.supports_depth_target(f.to_wgpu()))
        .unwrap_or(TargetFormat::R8Unorm);

    if format.is_float() {
        info!("depth targets use {:?}", format);
    } else {
        warn!("no float render target available, falling back to 8-bit depth; coverage is advisory");
    }
    format
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Supports(&'static [wgpu::TextureFormat]);

    impl FormatSupport for Supports {
        fn supports_depth_target(&self, format: wgpu::TextureFormat) -> bool {
            self.0.contains(&format)
        }
    }

    #[test]
    fn test_prefers_full_float() {
        let all = Supports(&[
            wgpu::TextureFormat::R8Unorm,
            wgpu::TextureFormat::R16Float,
            wgpu::TextureFormat::R32Float,
        ]);
        assert_eq!(negotiate(&all), TargetFormat::R32Float);
    }

    #[test]
    fn test_falls_back_to_half_then_8bit() {
        let half_only = Supports(&[wgpu::TextureFormat::R16Float, wgpu::TextureFormat::R8Unorm]);
        assert_eq!(negotiate(&half_only), TargetFormat::R16Float);

        let none = Supports(&[]);
        assert_eq!(negotiate(&none), TargetFormat::R8Unorm);
    }

    #[test]
    fn test_decode_formats() {
        let bytes: Vec<u8> = [0.25f32, 1.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(TargetFormat::R32Float.decode(&bytes), vec![0.25, 1.0]);

        let bytes: Vec<u8> = [half::f16::from_f32(0.5), half::f16::ONE]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        assert_eq!(TargetFormat::R16Float.decode(&bytes), vec![0.5, 1.0]);

        assert_eq!(TargetFormat::R8Unorm.decode(&[0, 255]), vec![0.0, 1.0]);
    }

    #[test]
    fn test_quantize_keeps_sentinel() {
        for format in TargetFormat::PREFERENCE {
            assert_eq!(format.quantize(1.0), 1.0);
            assert_eq!(format.quantize(0.0), 0.0);
            assert!((format.quantize(0.3) - 0.3).abs() <= format.quantum());
        }
    }
}
