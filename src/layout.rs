//! Buffer geometry computation
//!
//! Given dimensions, a pixel format, a tiling mode, and a hardware
//! generation, [`compute_layout`] returns the stride, per-plane byte
//! offsets, and total size a buffer must have to be both hardware-valid and
//! CPU-drawable. The function is pure: identical inputs always produce an
//! identical [`BufferGeometry`].

use crate::error::LayoutError;
use crate::format::{MAX_PLANES, PixelFormat};
use crate::tiling::{HardwareGen, TilingMode, tile_size};

/// Round `value` up to the next multiple of `alignment`
pub(crate) fn align(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Derived memory geometry of a buffer
///
/// `stride` is shared across all planes of a buffer (hardware requires one
/// pitch for the whole allocation). `offsets` are strictly increasing over
/// the real planes and zero-filled past the plane count; `offsets[0]` is
/// always zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferGeometry {
    /// Bytes per row, shared by every plane
    pub stride: u32,
    /// Total allocation size in bytes
    pub size: u64,
    /// Byte offset of each plane within the allocation
    pub offsets: [u64; MAX_PLANES],
}

/// Compute stride, per-plane offsets, and total size for a buffer
///
/// Packed formats take the single-plane path; on legacy generations with
/// tiling enabled the stride and size grow by power-of-two doubling to fit
/// the fence regions (deliberately over-allocating). Planar formats share
/// the largest per-plane stride and stack the planes tile-height-aligned.
///
/// # Errors
///
/// Returns [`LayoutError::UnsupportedTileBpp`] if the tiling mode has no
/// geometry for one of the format's plane bpp values.
pub fn compute_layout(
    width: u32,
    height: u32,
    format: PixelFormat,
    tiling: TilingMode,
    hw_gen: HardwareGen,
) -> Result<BufferGeometry, LayoutError> {
    if format.plane_count() > 1 {
        compute_planar(width, height, format, tiling, hw_gen)
    } else {
        compute_packed(width, height, format, tiling, hw_gen)
    }
}

fn compute_packed(
    width: u32,
    height: u32,
    format: PixelFormat,
    tiling: TilingMode,
    hw_gen: HardwareGen,
) -> Result<BufferGeometry, LayoutError> {
    let byte_width = u64::from(width) * u64::from(format.bpp()) / 8;
    let tile = tile_size(tiling, format.bpp(), hw_gen)?;

    let (stride, size) = if tiling != TilingMode::None && hw_gen.caps().fence_emulation {
        // Fence regions on these generations take power-of-two strides and
        // sizes only. Round both up; over-allocation is expected. This can
        // still fail for framebuffers too large to be tiled, but then that
        // failure is expected.
        let mut stride = 512u64;
        while stride < byte_width {
            stride *= 2;
        }

        let mut size = 1024 * 1024u64;
        while size < stride * u64::from(height) {
            size *= 2;
        }

        (stride, size)
    } else {
        let stride = align(byte_width, u64::from(tile.width));
        let size = stride * align(u64::from(height), u64::from(tile.height));
        (stride, size)
    };

    Ok(BufferGeometry {
        stride: stride as u32,
        size,
        offsets: [0; MAX_PLANES],
    })
}

fn compute_planar(
    width: u32,
    height: u32,
    format: PixelFormat,
    tiling: TilingMode,
    hw_gen: HardwareGen,
) -> Result<BufferGeometry, LayoutError> {
    let mut stride = 0u64;

    for plane in 0..format.plane_count() {
        let tile = tile_size(tiling, format.plane_bpp(plane), hw_gen)?;
        let plane_stride = align(
            u64::from(format.plane_byte_width(width, plane)),
            u64::from(tile.width),
        );
        stride = stride.max(plane_stride);
    }

    let mut offsets = [0u64; MAX_PLANES];
    let mut size = 0u64;

    for plane in 0..format.plane_count() {
        offsets[plane] = size;

        let tile = tile_size(tiling, format.plane_bpp(plane), hw_gen)?;
        size += stride
            * align(
                u64::from(format.plane_height(height, plane)),
                u64::from(tile.height),
            );
    }

    Ok(BufferGeometry {
        stride: stride as u32,
        size,
        offsets,
    })
}
