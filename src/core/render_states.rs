//! Render state configurations
//!
//! Provides convenient structs for configuring pass and pipeline states.

/// Clear state for render targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearState {
    /// Color to clear to (RGBA), or None to not clear.
    pub color: Option<[f32; 4]>,
    /// Depth value to clear to (0.0-1.0), or None to not clear.
    pub depth: Option<f32>,
}

impl ClearState {
    /// Create a clear state that clears color only.
    pub fn color(color: [f32; 4]) -> Self {
        Self {
            color: Some(color),
            depth: None,
        }
    }

    /// Create a clear state that clears both color and depth.
    pub fn color_and_depth(color: [f32; 4], depth: f32) -> Self {
        Self {
            color: Some(color),
            depth: Some(depth),
        }
    }

    /// Clear every channel and the depth attachment to `value`.
    ///
    /// Depth-encoding passes use this with the sentinel so that untouched
    /// pixels read back as "nothing here".
    pub fn splat(value: f32) -> Self {
        Self::color_and_depth([value; 4], 1.0)
    }

    /// Get the wgpu load operation for color.
    pub fn color_load_op(&self) -> wgpu::LoadOp<wgpu::Color> {
        match self.color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            None => wgpu::LoadOp::Load,
        }
    }

    /// Get the wgpu load operation for depth.
    pub fn depth_load_op(&self) -> wgpu::LoadOp<f32> {
        match self.depth {
            Some(d) => wgpu::LoadOp::Clear(d),
            None => wgpu::LoadOp::Load,
        }
    }
}

impl Default for ClearState {
    fn default() -> Self {
        Self::color_and_depth([0.0, 0.0, 0.0, 1.0], 1.0)
    }
}

/// Depth test configuration.
#[derive(Debug, Clone, Copy)]
pub struct DepthState {
    /// Whether to write to the depth buffer.
    pub write: bool,
    /// Comparison function for depth test.
    pub compare: wgpu::CompareFunction,
}

impl DepthState {
    /// Depth testing enabled with writes.
    pub fn read_write() -> Self {
        Self {
            write: true,
            compare: wgpu::CompareFunction::Less,
        }
    }

    /// Convert to wgpu depth stencil state.
    pub fn to_wgpu(&self, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.write,
            depth_compare: self.compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

impl Default for DepthState {
    fn default() -> Self {
        Self::read_write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splat_clears_every_channel() {
        let clear = ClearState::splat(1.0);
        assert_eq!(clear.color, Some([1.0; 4]));
        assert_eq!(clear.depth, Some(1.0));
        match clear.color_load_op() {
            wgpu::LoadOp::Clear(c) => assert_eq!(c.r, 1.0),
            _ => panic!("expected a clear op"),
        }
    }

    #[test]
    fn test_color_only_keeps_depth() {
        let clear = ClearState::color([0.5; 4]);
        assert!(matches!(clear.color_load_op(), wgpu::LoadOp::Clear(_)));
        assert!(matches!(clear.depth_load_op(), wgpu::LoadOp::Load));
    }

    #[test]
    fn test_depth_writes_nearest() {
        let state = DepthState::default().to_wgpu(wgpu::TextureFormat::Depth32Float);
        assert!(state.depth_write_enabled);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Less);
    }
}
