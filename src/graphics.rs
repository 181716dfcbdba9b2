//! Graphics support via embedded-graphics
//!
//! This module implements the
//! [`DrawTarget`](embedded_graphics_core::draw_target::DrawTarget) trait for
//! [`DrawSurface`], so the whole embedded-graphics ecosystem of primitives,
//! text, and images can render onto any framebuffer the library manages,
//! whatever its tiling or plane layout.
//!
//! Colors are [`Rgb888`]; the surface packs them into its own encoding.
//!
//! ## Example
//!
//! ```
//! use embedded_graphics::{
//!     pixelcolor::Rgb888,
//!     prelude::*,
//!     primitives::{PrimitiveStyle, Rectangle},
//! };
//! use fbkit::{Framebuffer, HardwareGen, MemoryDevice, PixelFormat, TilingMode};
//!
//! let mut dev = MemoryDevice::new();
//! let mut fb = Framebuffer::create(
//!     &mut dev,
//!     64,
//!     64,
//!     PixelFormat::Xrgb8888,
//!     TilingMode::Y,
//!     HardwareGen::new(9),
//! )?;
//!
//! let mut surface = fb.acquire_surface(&mut dev)?;
//! Rectangle::new(Point::new(8, 8), Size::new(16, 16))
//!     .into_styled(PrimitiveStyle::with_fill(Rgb888::new(0xFF, 0x00, 0x00)))
//!     .draw(&mut surface)
//!     .ok();
//! fb.release_surface(&mut dev, surface)?;
//! # Ok::<(), fbkit::Error<fbkit::MemoryDevice>>(())
//! ```

use core::convert::Infallible;
use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Size},
    pixelcolor::{Rgb888, RgbColor},
    prelude::Pixel,
};

use crate::device::BufferDevice;
use crate::surface::DrawSurface;

impl<D: BufferDevice> OriginDimensions for DrawSurface<D> {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

impl<D: BufferDevice> DrawTarget for DrawSurface<D> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(
                    point.x as u32,
                    point.y as u32,
                    color.r(),
                    color.g(),
                    color.b(),
                );
            }
        }
        Ok(())
    }
}
