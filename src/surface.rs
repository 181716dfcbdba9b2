//! Drawing surfaces over framebuffers
//!
//! A [`DrawSurface`] exposes a framebuffer as a linear, CPU-writable pixel
//! region regardless of how the storage is actually laid out. Three
//! strategies cover the catalog:
//!
//! - **Direct**: linear (or X-tiled) packed formats map the backing storage
//!   straight in; no copies.
//! - **Detile**: Y/Yf-tiled packed formats draw into a linear shadow buffer
//!   that is blitted from the framebuffer on acquire and back on release.
//! - **Convert**: NV12 draws into an RGB24 scratch image converted from
//!   (and back to) the planar data, detiling through a shadow first when
//!   the storage is Y/Yf-tiled.
//!
//! The strategy is selected once per session on
//! [`Framebuffer::acquire_surface`]; [`Framebuffer::release_surface`] runs
//! the matching write-back path and frees every temporary. One surface may
//! be outstanding per framebuffer at a time.
//!
//! ## Example
//!
//! ```
//! use fbkit::{Framebuffer, HardwareGen, MemoryDevice, PixelFormat, TilingMode};
//!
//! let mut dev = MemoryDevice::new();
//! let mut fb = Framebuffer::create(
//!     &mut dev,
//!     64,
//!     64,
//!     PixelFormat::Xrgb8888,
//!     TilingMode::None,
//!     HardwareGen::new(9),
//! )?;
//!
//! let mut surface = fb.acquire_surface(&mut dev)?;
//! surface.fill(0xFF, 0x00, 0x00);
//! fb.release_surface(&mut dev, surface)?;
//!
//! fb.destroy(&mut dev)?;
//! # Ok::<(), fbkit::Error<fbkit::MemoryDevice>>(())
//! ```

use alloc::vec;
use alloc::vec::Vec;

use crate::convert::{nv12_to_rgb24, rgb24_to_nv12};
use crate::device::{BufferDevice, BufferId, CopyOp};
use crate::error::Error;
use crate::format::{MAX_PLANES, PixelFormat};
use crate::framebuffer::{Framebuffer, allocate_storage};
use crate::layout::align;
use crate::tiling::TilingMode;

/// Scratch-image total sizes round up to whole pages
const PAGE_SIZE: u64 = 4096;

/// Drawing-surface state of a framebuffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceState {
    /// No surface is active
    Unmapped,
    /// The backing storage is mapped directly
    Direct,
    /// A shadow surface owns temporary storage
    Shadow(ShadowKind),
}

/// Which shadow strategy an active surface uses
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowKind {
    /// Linear copy of a tiled buffer
    Detile,
    /// RGB conversion of a planar buffer
    Convert,
}

/// Pixel encoding of a drawing surface
///
/// NV12 framebuffers draw through an RGB24 scratch image, so their surface
/// encoding is [`SurfaceEncoding::Xrgb8888`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceEncoding {
    /// 16-bit 5:6:5, little-endian
    Rgb565,
    /// 32-bit, byte order B, G, R, unused
    Xrgb8888,
    /// 32-bit 2:10:10:10, little-endian
    Xrgb2101010,
    /// 32-bit, byte order B, G, R, A
    Argb8888,
}

impl SurfaceEncoding {
    /// Bytes per pixel of this encoding
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb565 => 2,
            Self::Xrgb8888 | Self::Xrgb2101010 | Self::Argb8888 => 4,
        }
    }

    fn for_format(format: PixelFormat) -> Self {
        match format {
            PixelFormat::Rgb565 => Self::Rgb565,
            PixelFormat::Xrgb8888 | PixelFormat::Nv12 => Self::Xrgb8888,
            PixelFormat::Xrgb2101010 => Self::Xrgb2101010,
            PixelFormat::Argb8888 => Self::Argb8888,
        }
    }

    fn pack_into(self, pixel: &mut [u8], r: u8, g: u8, b: u8) {
        match self {
            Self::Rgb565 => {
                let value = (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3);
                pixel[..2].copy_from_slice(&value.to_le_bytes());
            }
            Self::Xrgb8888 => {
                pixel[0] = b;
                pixel[1] = g;
                pixel[2] = r;
                pixel[3] = 0;
            }
            Self::Argb8888 => {
                pixel[0] = b;
                pixel[1] = g;
                pixel[2] = r;
                pixel[3] = 0xFF;
            }
            Self::Xrgb2101010 => {
                // Replicate the top bits to widen 8-bit channels to 10.
                let widen = |c: u8| (u32::from(c) << 2) | (u32::from(c) >> 6);
                let value = (widen(r) << 20) | (widen(g) << 10) | widen(b);
                pixel[..4].copy_from_slice(&value.to_le_bytes());
            }
        }
    }
}

/// Linear temporary buffer backing a shadow surface
struct LinearShadow {
    id: BufferId,
    stride: u32,
    offsets: [u64; MAX_PLANES],
}

enum ConvertSource<D: BufferDevice> {
    /// Linear NV12 storage mapped directly
    Mapped { map: D::Mapping },
    /// Tiled NV12 storage detiled into a linear shadow
    Shadow { map: D::Mapping, shadow: LinearShadow },
}

enum SurfaceBacking<D: BufferDevice> {
    Direct {
        map: D::Mapping,
    },
    Detile {
        map: D::Mapping,
        shadow: LinearShadow,
    },
    Convert {
        rgb: Vec<u8>,
        source: ConvertSource<D>,
    },
}

/// A linear, CPU-writable view of a framebuffer
///
/// Obtained from [`Framebuffer::acquire_surface`]; every write becomes
/// visible in the framebuffer once the surface is passed back to
/// [`Framebuffer::release_surface`]. With the `graphics` feature the
/// surface is an `embedded-graphics` draw target.
pub struct DrawSurface<D: BufferDevice> {
    owner: BufferId,
    width: u32,
    height: u32,
    stride: u32,
    encoding: SurfaceEncoding,
    backing: SurfaceBacking<D>,
}

impl<D: BufferDevice> DrawSurface<D> {
    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row of the drawable region
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Pixel encoding of the drawable region
    pub fn encoding(&self) -> SurfaceEncoding {
        self.encoding
    }

    /// Raw drawable bytes
    pub fn bytes(&self) -> &[u8] {
        match &self.backing {
            SurfaceBacking::Direct { map } => map.as_ref(),
            SurfaceBacking::Detile { map, .. } => map.as_ref(),
            SurfaceBacking::Convert { rgb, .. } => rgb,
        }
    }

    /// Raw drawable bytes, mutable
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.backing {
            SurfaceBacking::Direct { map } => map.as_mut(),
            SurfaceBacking::Detile { map, .. } => map.as_mut(),
            SurfaceBacking::Convert { rgb, .. } => rgb,
        }
    }

    /// Write one pixel
    ///
    /// Coordinates outside the surface are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let bpp = self.encoding.bytes_per_pixel();
        let offset = y as usize * self.stride as usize + x as usize * bpp;
        let encoding = self.encoding;
        encoding.pack_into(&mut self.bytes_mut()[offset..offset + bpp], r, g, b);
    }

    /// Fill a rectangle with a solid color
    ///
    /// The rectangle is clipped to the surface.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, r: u8, g: u8, b: u8) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for py in y..y_end {
            for px in x..x_end {
                self.set_pixel(px, py, r, g, b);
            }
        }
    }

    /// Fill the whole surface with a solid color
    pub fn fill(&mut self, r: u8, g: u8, b: u8) {
        self.fill_rect(0, 0, self.width, self.height, r, g, b);
    }
}

impl Framebuffer {
    /// Acquire the drawing surface for this framebuffer
    ///
    /// Selects and runs the access strategy: direct mapping for linear and
    /// X-tiled packed formats, a detile shadow for Y/Yf-tiled packed
    /// formats, and RGB conversion for NV12. The returned surface must be
    /// handed back to [`release_surface`](Self::release_surface).
    ///
    /// # Errors
    ///
    /// Fails with [`Error::SurfaceActive`] while a previous surface is
    /// outstanding, or with [`Error::Device`] if a backend primitive fails.
    pub fn acquire_surface<D: BufferDevice>(
        &mut self,
        dev: &mut D,
    ) -> Result<DrawSurface<D>, Error<D>> {
        if self.state != SurfaceState::Unmapped {
            return Err(Error::SurfaceActive);
        }

        if self.num_planes > 1 {
            self.acquire_convert(dev)
        } else if self.tiling.needs_detile() {
            self.acquire_detile(dev)
        } else {
            self.acquire_direct(dev)
        }
    }

    /// Release a drawing surface, writing pending pixels back
    ///
    /// Runs the write-back path of the surface's strategy (flush
    /// notification, retile blit, or RGB-to-NV12 conversion) and frees all
    /// temporary storage. By the time this returns, the framebuffer
    /// reflects every write made through the surface.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NoActiveSurface`] if no surface is outstanding,
    /// [`Error::ForeignSurface`] if the surface came from another
    /// framebuffer, or [`Error::Device`] on backend failure.
    pub fn release_surface<D: BufferDevice>(
        &mut self,
        dev: &mut D,
        surface: DrawSurface<D>,
    ) -> Result<(), Error<D>> {
        if self.state == SurfaceState::Unmapped {
            return Err(Error::NoActiveSurface);
        }
        if surface.owner != self.id {
            return Err(Error::ForeignSurface {
                expected: self.id,
                provided: surface.owner,
            });
        }

        // The session ends here whatever happens below; temporaries are
        // consumed on every path.
        self.state = SurfaceState::Unmapped;

        match surface.backing {
            SurfaceBacking::Direct { map } => {
                dev.unmap(self.id, map).map_err(Error::Device)?;
                if self.is_dumb {
                    dev.dirty(self.id).map_err(Error::Device)?;
                }
                Ok(())
            }
            SurfaceBacking::Detile { map, shadow } => self.release_shadow(dev, shadow, map),
            SurfaceBacking::Convert { rgb, source } => {
                let rgb_stride = surface.stride;
                match source {
                    ConvertSource::Mapped { mut map } => {
                        self.convert_back(&rgb, rgb_stride, map.as_mut(), self.geometry.stride, &self.geometry.offsets);
                        dev.unmap(self.id, map).map_err(Error::Device)
                    }
                    ConvertSource::Shadow { mut map, shadow } => {
                        self.convert_back(&rgb, rgb_stride, map.as_mut(), shadow.stride, &shadow.offsets);
                        self.release_shadow(dev, shadow, map)
                    }
                }
            }
        }
    }

    fn acquire_direct<D: BufferDevice>(
        &mut self,
        dev: &mut D,
    ) -> Result<DrawSurface<D>, Error<D>> {
        log::debug!("acquire_surface(handle={}): direct mapping", self.id.0);

        let map = dev.map(self.id).map_err(Error::Device)?;
        self.state = SurfaceState::Direct;

        Ok(DrawSurface {
            owner: self.id,
            width: self.width,
            height: self.height,
            stride: self.geometry.stride,
            encoding: SurfaceEncoding::for_format(self.format),
            backing: SurfaceBacking::Direct { map },
        })
    }

    fn acquire_detile<D: BufferDevice>(
        &mut self,
        dev: &mut D,
    ) -> Result<DrawSurface<D>, Error<D>> {
        log::debug!(
            "acquire_surface(handle={}): detile via linear copy",
            self.id.0
        );

        let (shadow, map) = self.setup_linear_shadow(dev)?;
        self.state = SurfaceState::Shadow(ShadowKind::Detile);

        Ok(DrawSurface {
            owner: self.id,
            width: self.width,
            height: self.height,
            stride: shadow.stride,
            encoding: SurfaceEncoding::for_format(self.format),
            backing: SurfaceBacking::Detile { map, shadow },
        })
    }

    fn acquire_convert<D: BufferDevice>(
        &mut self,
        dev: &mut D,
    ) -> Result<DrawSurface<D>, Error<D>> {
        log::debug!("acquire_surface(handle={}): rgb conversion", self.id.0);

        let rgb_stride = align(u64::from(self.width) * 4, 16) as u32;
        let rgb_size = align(u64::from(rgb_stride) * u64::from(self.height), PAGE_SIZE);
        let mut rgb = vec![0u8; rgb_size as usize];

        let source = if self.tiling.needs_detile() {
            let (shadow, map) = self.setup_linear_shadow(dev)?;
            ConvertSource::Shadow { map, shadow }
        } else {
            let map = dev.map(self.id).map_err(Error::Device)?;
            ConvertSource::Mapped { map }
        };

        {
            let (bytes, stride, offsets): (&[u8], u32, &[u64; MAX_PLANES]) = match &source {
                ConvertSource::Mapped { map } => {
                    (AsRef::<[u8]>::as_ref(map), self.geometry.stride, &self.geometry.offsets)
                }
                ConvertSource::Shadow { map, shadow } => {
                    (AsRef::<[u8]>::as_ref(map), shadow.stride, &shadow.offsets)
                }
            };
            nv12_to_rgb24(
                &bytes[offsets[0] as usize..],
                &bytes[offsets[1] as usize..],
                self.width,
                self.height,
                stride,
                stride,
                &mut rgb,
                rgb_stride,
            );
        }

        self.state = SurfaceState::Shadow(ShadowKind::Convert);

        Ok(DrawSurface {
            owner: self.id,
            width: self.width,
            height: self.height,
            stride: rgb_stride,
            encoding: SurfaceEncoding::for_format(self.format),
            backing: SurfaceBacking::Convert { rgb, source },
        })
    }

    /// Allocate a linear twin of this framebuffer and detile into it
    ///
    /// The shadow is synced and mapped before being returned; the caller
    /// owns both until [`release_shadow`](Self::release_shadow).
    fn setup_linear_shadow<D: BufferDevice>(
        &self,
        dev: &mut D,
    ) -> Result<(LinearShadow, D::Mapping), Error<D>> {
        let alloc = allocate_storage(
            dev,
            self.width,
            self.height,
            self.format,
            TilingMode::None,
            self.hw_gen,
            0,
            0,
        )?;

        for plane in 0..self.num_planes {
            dev.blit(&CopyOp {
                src: self.id,
                src_offset: self.geometry.offsets[plane],
                src_stride: self.geometry.stride,
                src_tiling: self.tiling,
                dst: alloc.id,
                dst_offset: alloc.geometry.offsets[plane],
                dst_stride: alloc.geometry.stride,
                dst_tiling: TilingMode::None,
                width: self.plane_width[plane],
                height: self.plane_height[plane],
                bpp: self.plane_bpp[plane],
            })
            .map_err(Error::Device)?;
        }
        dev.sync(alloc.id).map_err(Error::Device)?;

        let map = dev.map(alloc.id).map_err(Error::Device)?;
        Ok((
            LinearShadow {
                id: alloc.id,
                stride: alloc.geometry.stride,
                offsets: alloc.geometry.offsets,
            },
            map,
        ))
    }

    /// Retile a shadow back into the framebuffer and free it
    fn release_shadow<D: BufferDevice>(
        &self,
        dev: &mut D,
        shadow: LinearShadow,
        map: D::Mapping,
    ) -> Result<(), Error<D>> {
        dev.unmap(shadow.id, map).map_err(Error::Device)?;

        for plane in 0..self.num_planes {
            dev.blit(&CopyOp {
                src: shadow.id,
                src_offset: shadow.offsets[plane],
                src_stride: shadow.stride,
                src_tiling: TilingMode::None,
                dst: self.id,
                dst_offset: self.geometry.offsets[plane],
                dst_stride: self.geometry.stride,
                dst_tiling: self.tiling,
                width: self.plane_width[plane],
                height: self.plane_height[plane],
                bpp: self.plane_bpp[plane],
            })
            .map_err(Error::Device)?;
        }
        dev.sync(shadow.id).map_err(Error::Device)?;
        dev.destroy(shadow.id).map_err(Error::Device)?;

        log::debug!(
            "release_surface(handle={}): shadow {} written back",
            self.id.0,
            shadow.id.0
        );
        Ok(())
    }

    /// Convert the RGB scratch image back into linear NV12 bytes
    fn convert_back(
        &self,
        rgb: &[u8],
        rgb_stride: u32,
        nv12: &mut [u8],
        nv12_stride: u32,
        offsets: &[u64; MAX_PLANES],
    ) {
        let (luma, chroma) = nv12.split_at_mut(offsets[1] as usize);
        rgb24_to_nv12(
            rgb,
            self.width,
            self.height,
            rgb_stride,
            &mut luma[offsets[0] as usize..],
            chroma,
            nv12_stride,
            nv12_stride,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDevice;
    use crate::tiling::HardwareGen;

    const GEN9: HardwareGen = HardwareGen {
        major: 9,
        family_915: false,
    };

    fn fb(
        dev: &mut MemoryDevice,
        width: u32,
        height: u32,
        format: PixelFormat,
        tiling: TilingMode,
    ) -> Framebuffer {
        Framebuffer::create(dev, width, height, format, tiling, GEN9).unwrap()
    }

    #[test]
    fn test_strategy_selection() {
        let mut dev = MemoryDevice::new();

        let mut linear = fb(&mut dev, 32, 32, PixelFormat::Xrgb8888, TilingMode::None);
        let s = linear.acquire_surface(&mut dev).unwrap();
        assert_eq!(linear.surface_state(), SurfaceState::Direct);
        linear.release_surface(&mut dev, s).unwrap();

        let mut x_tiled = fb(&mut dev, 32, 32, PixelFormat::Xrgb8888, TilingMode::X);
        let s = x_tiled.acquire_surface(&mut dev).unwrap();
        assert_eq!(x_tiled.surface_state(), SurfaceState::Direct);
        x_tiled.release_surface(&mut dev, s).unwrap();

        let mut y_tiled = fb(&mut dev, 32, 32, PixelFormat::Xrgb8888, TilingMode::Y);
        let s = y_tiled.acquire_surface(&mut dev).unwrap();
        assert_eq!(
            y_tiled.surface_state(),
            SurfaceState::Shadow(ShadowKind::Detile)
        );
        y_tiled.release_surface(&mut dev, s).unwrap();

        let mut planar = fb(&mut dev, 32, 32, PixelFormat::Nv12, TilingMode::None);
        let s = planar.acquire_surface(&mut dev).unwrap();
        assert_eq!(
            planar.surface_state(),
            SurfaceState::Shadow(ShadowKind::Convert)
        );
        planar.release_surface(&mut dev, s).unwrap();
    }

    #[test]
    fn test_second_acquire_is_a_state_violation() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 32, 32, PixelFormat::Xrgb8888, TilingMode::None);

        let surface = fb.acquire_surface(&mut dev).unwrap();
        assert!(matches!(
            fb.acquire_surface(&mut dev),
            Err(Error::SurfaceActive)
        ));
        fb.release_surface(&mut dev, surface).unwrap();
    }

    #[test]
    fn test_release_without_acquire_is_a_state_violation() {
        let mut dev = MemoryDevice::new();
        let mut a = fb(&mut dev, 32, 32, PixelFormat::Xrgb8888, TilingMode::None);
        let mut b = fb(&mut dev, 32, 32, PixelFormat::Xrgb8888, TilingMode::None);

        let surface = a.acquire_surface(&mut dev).unwrap();
        assert!(matches!(
            b.release_surface(&mut dev, surface),
            Err(Error::NoActiveSurface)
        ));
    }

    #[test]
    fn test_release_foreign_surface_is_rejected() {
        let mut dev = MemoryDevice::new();
        let mut a = fb(&mut dev, 32, 32, PixelFormat::Xrgb8888, TilingMode::None);
        let mut b = fb(&mut dev, 32, 32, PixelFormat::Xrgb8888, TilingMode::None);

        let surface_a = a.acquire_surface(&mut dev).unwrap();
        let _surface_b = b.acquire_surface(&mut dev).unwrap();
        assert!(matches!(
            b.release_surface(&mut dev, surface_a),
            Err(Error::ForeignSurface { .. })
        ));
    }

    #[test]
    fn test_destroy_with_active_surface_is_rejected() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 32, 32, PixelFormat::Xrgb8888, TilingMode::None);
        let _surface = fb.acquire_surface(&mut dev).unwrap();
        assert!(matches!(fb.destroy(&mut dev), Err(Error::SurfaceActive)));
    }

    #[test]
    fn test_direct_writes_land_in_storage_and_flush() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 32, 8, PixelFormat::Xrgb8888, TilingMode::None);
        assert!(fb.is_dumb());
        let stride = fb.stride() as usize;

        let mut surface = fb.acquire_surface(&mut dev).unwrap();
        surface.set_pixel(10, 3, 0xFF, 0x20, 0x01);
        fb.release_surface(&mut dev, surface).unwrap();

        let data = dev.data(fb.buffer_id()).unwrap();
        let offset = 3 * stride + 10 * 4;
        assert_eq!(&data[offset..offset + 4], &[0x01, 0x20, 0xFF, 0x00]);
        // Dumb storage gets the flush notification on release.
        assert_eq!(dev.dirty_log(), &[fb.buffer_id()]);
    }

    #[test]
    fn test_direct_non_dumb_skips_flush() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 32, 8, PixelFormat::Xrgb8888, TilingMode::X);

        let surface = fb.acquire_surface(&mut dev).unwrap();
        fb.release_surface(&mut dev, surface).unwrap();
        assert!(dev.dirty_log().is_empty());
    }

    #[test]
    fn test_detile_writes_back_through_shadow() {
        let mut dev = MemoryDevice::new();
        // 100 px rows: the Y-tiled stride (512) differs from the linear
        // shadow's (448), so the write-back must convert pitches.
        let mut fb = fb(&mut dev, 100, 40, PixelFormat::Xrgb8888, TilingMode::Y);
        assert_eq!(fb.stride(), 512);

        let mut surface = fb.acquire_surface(&mut dev).unwrap();
        assert_eq!(surface.stride(), 448);
        surface.set_pixel(99, 39, 0xAA, 0xBB, 0xCC);
        fb.release_surface(&mut dev, surface).unwrap();

        // Shadow freed: only the framebuffer's storage remains.
        assert_eq!(dev.buffer_count(), 1);
        let data = dev.data(fb.buffer_id()).unwrap();
        let offset = 39 * 512 + 99 * 4;
        assert_eq!(&data[offset..offset + 4], &[0xCC, 0xBB, 0xAA, 0x00]);
    }

    #[test]
    fn test_detile_surface_sees_existing_content() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 16, 16, PixelFormat::Xrgb8888, TilingMode::Yf);

        // Seed the hardware buffer, then check the detiled view shows it.
        {
            let mut surface = fb.acquire_surface(&mut dev).unwrap();
            surface.set_pixel(5, 5, 1, 2, 3);
            fb.release_surface(&mut dev, surface).unwrap();
        }

        let surface = fb.acquire_surface(&mut dev).unwrap();
        let stride = surface.stride() as usize;
        let offset = 5 * stride + 5 * 4;
        assert_eq!(&surface.bytes()[offset..offset + 4], &[3, 2, 1, 0]);
        fb.release_surface(&mut dev, surface).unwrap();
    }

    #[test]
    fn test_convert_surface_round_trips_solid_color() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 4, 4, PixelFormat::Nv12, TilingMode::None);
        let stride = fb.stride() as usize;
        let chroma_start = fb.geometry().offsets[1] as usize;

        let mut surface = fb.acquire_surface(&mut dev).unwrap();
        surface.fill(0xFF, 0x00, 0x00);
        fb.release_surface(&mut dev, surface).unwrap();

        let data = dev.data(fb.buffer_id()).unwrap();
        // Solid red encodes to Y=62, U=102, V=239.
        for row in 0..4 {
            assert_eq!(&data[row * stride..row * stride + 4], &[62, 62, 62, 62]);
        }
        for row in 0..2 {
            let uv = &data[chroma_start + row * stride..chroma_start + row * stride + 4];
            assert_eq!(uv, &[102, 239, 102, 239]);
        }
    }

    #[test]
    fn test_convert_surface_shows_black_frame() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 8, 8, PixelFormat::Nv12, TilingMode::None);

        // The freshly created NV12 buffer is a video-black frame; the
        // converted view must read as RGB black.
        let surface = fb.acquire_surface(&mut dev).unwrap();
        let stride = surface.stride() as usize;
        for row in 0..8 {
            for px in 0..8 {
                let offset = row * stride + px * 4;
                assert_eq!(&surface.bytes()[offset..offset + 3], &[0, 0, 0]);
            }
        }
        fb.release_surface(&mut dev, surface).unwrap();
    }

    #[test]
    fn test_convert_on_tiled_nv12_uses_shadow() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 64, 64, PixelFormat::Nv12, TilingMode::Y);
        assert_eq!(fb.stride(), 128);

        let mut surface = fb.acquire_surface(&mut dev).unwrap();
        // Framebuffer storage plus the detile shadow.
        assert_eq!(dev.buffer_count(), 2);
        surface.fill(0xFF, 0x00, 0x00);
        fb.release_surface(&mut dev, surface).unwrap();
        assert_eq!(dev.buffer_count(), 1);

        let data = dev.data(fb.buffer_id()).unwrap();
        let chroma_start = fb.geometry().offsets[1] as usize;
        assert_eq!(data[10 * 128 + 63], 62);
        assert_eq!(&data[chroma_start..chroma_start + 2], &[102, 239]);
    }

    #[test]
    fn test_convert_rgb_scratch_geometry() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 3, 3, PixelFormat::Nv12, TilingMode::None);

        let surface = fb.acquire_surface(&mut dev).unwrap();
        // 12-byte rows round up to the 16-byte scratch pitch; the scratch
        // image itself rounds up to a page.
        assert_eq!(surface.stride(), 16);
        assert_eq!(surface.bytes().len(), 4096);
        assert_eq!(surface.encoding(), SurfaceEncoding::Xrgb8888);
        fb.release_surface(&mut dev, surface).unwrap();
    }

    #[test]
    fn test_reacquire_after_release() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 16, 16, PixelFormat::Xrgb8888, TilingMode::Y);

        for _ in 0..3 {
            let surface = fb.acquire_surface(&mut dev).unwrap();
            fb.release_surface(&mut dev, surface).unwrap();
        }
        assert_eq!(fb.surface_state(), SurfaceState::Unmapped);
        assert_eq!(dev.buffer_count(), 1);
    }

    #[test]
    fn test_pixel_encodings() {
        let mut dev = MemoryDevice::new();

        let mut fb565 = fb(&mut dev, 8, 1, PixelFormat::Rgb565, TilingMode::None);
        let mut surface = fb565.acquire_surface(&mut dev).unwrap();
        surface.set_pixel(0, 0, 0xFF, 0x00, 0x00);
        assert_eq!(&surface.bytes()[..2], &0xF800u16.to_le_bytes());
        fb565.release_surface(&mut dev, surface).unwrap();

        let mut fb30 = fb(&mut dev, 8, 1, PixelFormat::Xrgb2101010, TilingMode::None);
        let mut surface = fb30.acquire_surface(&mut dev).unwrap();
        surface.set_pixel(0, 0, 0xFF, 0xFF, 0xFF);
        assert_eq!(&surface.bytes()[..4], &0x3FFF_FFFFu32.to_le_bytes());
        fb30.release_surface(&mut dev, surface).unwrap();

        let mut fb_argb = fb(&mut dev, 8, 1, PixelFormat::Argb8888, TilingMode::None);
        let mut surface = fb_argb.acquire_surface(&mut dev).unwrap();
        surface.set_pixel(0, 0, 1, 2, 3);
        assert_eq!(&surface.bytes()[..4], &[3, 2, 1, 0xFF]);
        fb_argb.release_surface(&mut dev, surface).unwrap();
    }

    #[test]
    fn test_fill_rect_clips_and_bounds() {
        let mut dev = MemoryDevice::new();
        let mut fb = fb(&mut dev, 8, 4, PixelFormat::Xrgb8888, TilingMode::None);
        let stride = fb.stride() as usize;

        let mut surface = fb.acquire_surface(&mut dev).unwrap();
        surface.fill_rect(6, 2, 100, 100, 0x10, 0x20, 0x30);

        assert_eq!(&surface.bytes()[2 * stride + 6 * 4..2 * stride + 6 * 4 + 3], &[0x30, 0x20, 0x10]);
        // Outside the rectangle stays untouched.
        assert_eq!(&surface.bytes()[..4], &[0, 0, 0, 0]);
        fb.release_surface(&mut dev, surface).unwrap();
    }
}
