//! Texture readback
//!
//! Copies a color texture into a staging buffer and maps it on the host.

use crate::context::WgpuContext;
use crate::core::buffer::ReadbackBuffer;
use crate::core::texture::Texture2D;
use anyhow::Context;

/// Row pitch for a texture-to-buffer copy, rounded up to wgpu's alignment.
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Read a whole texture back to the CPU synchronously.
///
/// Returns tightly packed rows (`width * bytes_per_pixel` bytes each), top row
/// first. Blocks until the GPU has finished all submitted work.
pub fn read_texture(
    ctx: &WgpuContext,
    texture: &Texture2D,
    bytes_per_pixel: u32,
) -> anyhow::Result<Vec<u8>> {
    let (width, height) = texture.size();
    let padded_row = padded_bytes_per_row(width, bytes_per_pixel);
    let unpadded_row = (width * bytes_per_pixel) as usize;

    let staging = ReadbackBuffer::new(
        ctx,
        padded_row as u64 * height as u64,
        Some("depth readback staging"),
    );

    let mut encoder = ctx.create_encoder(Some("depth readback copy"));
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: texture.texture(),
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: staging.buffer(),
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    ctx.submit([encoder.finish()]);

    let slice = staging.buffer().slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        // The receiver only goes away if this function already bailed out.
        let _ = tx.send(result);
    });
    ctx.device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| anyhow::anyhow!("device poll failed: {e}"))?;
    rx.recv()
        .context("map callback was dropped")?
        .map_err(|e| anyhow::anyhow!("failed to map staging buffer: {e}"))?;

    let data = slice.get_mapped_range();
    let mut packed = Vec::with_capacity(unpadded_row * height as usize);
    for row in data.chunks(padded_row as usize) {
        packed.extend_from_slice(&row[..unpadded_row]);
    }
    drop(data);
    staging.buffer().unmap();

    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(padded_bytes_per_row(64, 4), 256);
        assert_eq!(padded_bytes_per_row(65, 4), 512);
        assert_eq!(padded_bytes_per_row(4096, 4), 16384);
        assert_eq!(padded_bytes_per_row(100, 1), 256);
        assert_eq!(padded_bytes_per_row(300, 2), 768);
    }
}
