//! Framebuffer creation and lifecycle
//!
//! A [`Framebuffer`] ties together the requested dimensions and format, the
//! computed [`BufferGeometry`](crate::BufferGeometry), the backing device
//! buffer, and the drawing-surface state. Creation allocates and prepares
//! the storage; [`Framebuffer::destroy`] releases it.

use crate::device::{BufferDevice, BufferId};
use crate::error::Error;
use crate::format::{MAX_PLANES, PixelFormat};
use crate::layout::{BufferGeometry, compute_layout};
use crate::surface::SurfaceState;
use crate::tiling::{HardwareGen, TilingMode};

/// Storage allocated for a framebuffer or a linear shadow
pub(crate) struct Allocation {
    pub id: BufferId,
    pub geometry: BufferGeometry,
    pub is_dumb: bool,
}

/// Allocate backing storage for the given parameters
///
/// Tiled, planar, or explicitly-sized buffers are allocated with the
/// computed (or overridden) geometry; plain linear packed buffers take the
/// dumb-buffer path and adopt the device-chosen pitch and size. NV12
/// storage is mid-point filled so the allocation starts out as a valid
/// black frame.
#[allow(clippy::too_many_arguments)]
pub(crate) fn allocate_storage<D: BufferDevice>(
    dev: &mut D,
    width: u32,
    height: u32,
    format: PixelFormat,
    tiling: TilingMode,
    hw_gen: HardwareGen,
    size_hint: u64,
    stride_hint: u32,
) -> Result<Allocation, Error<D>> {
    if tiling != TilingMode::None
        || size_hint != 0
        || stride_hint != 0
        || format.plane_count() > 1
    {
        let mut geometry =
            compute_layout(width, height, format, tiling, hw_gen).map_err(Error::Layout)?;
        if stride_hint != 0 {
            geometry.stride = stride_hint;
        }
        if size_hint != 0 {
            geometry.size = size_hint;
        }

        let id = dev.create(geometry.size).map_err(Error::Device)?;

        if format == PixelFormat::Nv12 {
            // Component formats have a different zero point: luma 16,
            // chroma 128.
            let mut map = dev.map(id).map_err(Error::Device)?;
            let bytes = map.as_mut();
            let chroma_start = geometry.offsets[1] as usize;
            let chroma_len = height.div_ceil(2) as usize * geometry.stride as usize;
            for b in &mut bytes[..chroma_start] {
                *b = 16;
            }
            for b in &mut bytes[chroma_start..chroma_start + chroma_len] {
                *b = 0x80;
            }
            dev.unmap(id, map).map_err(Error::Device)?;
        }

        Ok(Allocation {
            id,
            geometry,
            is_dumb: false,
        })
    } else {
        let dumb = dev
            .create_dumb(width, height, format.bpp())
            .map_err(Error::Device)?;
        Ok(Allocation {
            id: dumb.id,
            geometry: BufferGeometry {
                stride: dumb.stride,
                size: dumb.size,
                offsets: [0; MAX_PLANES],
            },
            is_dumb: true,
        })
    }
}

/// A device buffer wrapped with framebuffer metadata
///
/// Holds everything drawing needs: logical dimensions, per-plane
/// dimensions, the computed geometry, and the surface session state. One
/// surface may be active at a time; see
/// [`acquire_surface`](Framebuffer::acquire_surface).
pub struct Framebuffer {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: PixelFormat,
    pub(crate) tiling: TilingMode,
    pub(crate) hw_gen: HardwareGen,
    pub(crate) geometry: BufferGeometry,
    pub(crate) plane_width: [u32; MAX_PLANES],
    pub(crate) plane_height: [u32; MAX_PLANES],
    pub(crate) plane_bpp: [u32; MAX_PLANES],
    pub(crate) num_planes: usize,
    pub(crate) id: BufferId,
    pub(crate) is_dumb: bool,
    pub(crate) state: SurfaceState,
}

impl Framebuffer {
    /// Create a framebuffer with automatically computed geometry
    ///
    /// The storage is zero-filled (black for RGB formats); NV12 storage is
    /// mid-point filled instead, which is black in video levels.
    pub fn create<D: BufferDevice>(
        dev: &mut D,
        width: u32,
        height: u32,
        format: PixelFormat,
        tiling: TilingMode,
        hw_gen: HardwareGen,
    ) -> Result<Self, Error<D>> {
        Self::create_with_size(dev, width, height, format, tiling, hw_gen, 0, 0)
    }

    /// Create a framebuffer, optionally overriding size and stride
    ///
    /// A zero `size_hint` or `stride_hint` means "compute it"; nonzero
    /// values are adopted as-is for callers that need a specific
    /// allocation.
    #[allow(clippy::too_many_arguments)]
    pub fn create_with_size<D: BufferDevice>(
        dev: &mut D,
        width: u32,
        height: u32,
        format: PixelFormat,
        tiling: TilingMode,
        hw_gen: HardwareGen,
        size_hint: u64,
        stride_hint: u32,
    ) -> Result<Self, Error<D>> {
        log::debug!(
            "create(width={width}, height={height}, format={}, tiling={tiling:?}, size={size_hint})",
            format.name()
        );

        let alloc = allocate_storage(dev, width, height, format, tiling, hw_gen, size_hint, stride_hint)?;

        log::debug!(
            "create(handle={}, pitch={})",
            alloc.id.0,
            alloc.geometry.stride
        );

        let mut plane_width = [0u32; MAX_PLANES];
        let mut plane_height = [0u32; MAX_PLANES];
        let mut plane_bpp = [0u32; MAX_PLANES];
        plane_width[0] = width;
        plane_height[0] = height;
        plane_bpp[0] = format.bpp();
        for plane in 0..format.plane_count() {
            plane_width[plane] = format.plane_width(width, plane);
            plane_height[plane] = format.plane_height(height, plane);
            plane_bpp[plane] = format.plane_bpp(plane);
        }

        Ok(Self {
            width,
            height,
            format,
            tiling,
            hw_gen,
            geometry: alloc.geometry,
            plane_width,
            plane_height,
            plane_bpp,
            num_planes: format.plane_count().max(1),
            id: alloc.id,
            is_dumb: alloc.is_dumb,
            state: SurfaceState::Unmapped,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Tiling layout of the backing storage
    pub fn tiling(&self) -> TilingMode {
        self.tiling
    }

    /// Hardware generation the layout was computed for
    pub fn hardware_gen(&self) -> HardwareGen {
        self.hw_gen
    }

    /// Memory geometry of the backing storage
    pub fn geometry(&self) -> &BufferGeometry {
        &self.geometry
    }

    /// Shared stride in bytes
    pub fn stride(&self) -> u32 {
        self.geometry.stride
    }

    /// Total allocation size in bytes
    pub fn size(&self) -> u64 {
        self.geometry.size
    }

    /// Number of planes
    pub fn plane_count(&self) -> usize {
        self.num_planes
    }

    /// Logical width of one plane
    pub fn plane_width(&self, plane: usize) -> u32 {
        self.plane_width[plane]
    }

    /// Logical height of one plane
    pub fn plane_height(&self, plane: usize) -> u32 {
        self.plane_height[plane]
    }

    /// Backing buffer handle
    pub fn buffer_id(&self) -> BufferId {
        self.id
    }

    /// Whether the backing storage is a dumb (CPU-only) buffer
    pub fn is_dumb(&self) -> bool {
        self.is_dumb
    }

    /// Current drawing-surface state
    pub fn surface_state(&self) -> SurfaceState {
        self.state
    }

    /// Release the backing storage
    ///
    /// # Errors
    ///
    /// Fails with [`Error::SurfaceActive`] if a drawing surface is still
    /// outstanding; release it first.
    pub fn destroy<D: BufferDevice>(self, dev: &mut D) -> Result<(), Error<D>> {
        if self.state != SurfaceState::Unmapped {
            return Err(Error::SurfaceActive);
        }
        dev.destroy(self.id).map_err(Error::Device)
    }
}
