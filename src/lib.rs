//! Framebuffer layout and drawing-surface library for display driver test
//! harnesses
//!
//! Given a pixel format, dimensions, and a hardware tiling layout, this
//! library computes the exact memory geometry a buffer needs to be both
//! hardware-valid and CPU-drawable (per-plane stride, per-plane byte
//! offsets, total size) and then exposes a uniform drawing surface over
//! that buffer whether the storage is linear, hardware-tiled, or
//! multi-plane YUV.
//!
//! ## Features
//!
//! - `no_std` compatible (requires `alloc`)
//! - Pure, idempotent layout math with generation-dependent tiling rules
//! - Three drawing strategies: direct mapping, detile-via-copy, and
//!   NV12-to-RGB conversion, selected automatically per framebuffer
//! - Backend-agnostic: any allocator/blitter behind the [`BufferDevice`]
//!   trait, with [`MemoryDevice`] as a ready software backend
//! - `embedded-graphics` integration (with `graphics` feature)
//!
//! ## Usage
//!
//! ```rust
//! use fbkit::{Framebuffer, HardwareGen, MemoryDevice, PixelFormat, TilingMode};
//!
//! let mut dev = MemoryDevice::new();
//!
//! // A Y-tiled framebuffer draws through a detile shadow; the caller
//! // never sees the difference.
//! let mut fb = Framebuffer::create(
//!     &mut dev,
//!     640,
//!     480,
//!     PixelFormat::Xrgb8888,
//!     TilingMode::Y,
//!     HardwareGen::new(9),
//! )?;
//!
//! let mut surface = fb.acquire_surface(&mut dev)?;
//! surface.fill_rect(100, 100, 64, 64, 0xFF, 0xFF, 0xFF);
//! fb.release_surface(&mut dev, surface)?;
//!
//! fb.destroy(&mut dev)?;
//! # Ok::<(), fbkit::Error<fbkit::MemoryDevice>>(())
//! ```

#![no_std]

extern crate alloc;

/// NV12 to RGB24 pixel conversion and back
pub mod convert;
/// Buffer device trait and the in-memory software device
pub mod device;
/// Error types for the library
pub mod error;
/// Pixel format catalog
pub mod format;
/// Framebuffer creation and lifecycle
pub mod framebuffer;
/// Buffer geometry computation
pub mod layout;
/// Drawing surfaces and access strategies
pub mod surface;
/// Tiling modes and hardware tile geometry
pub mod tiling;

/// Graphics support via embedded-graphics (requires `graphics` feature)
#[cfg(feature = "graphics")]
pub mod graphics;

pub use convert::{nv12_to_rgb24, rgb24_to_nv12};
pub use device::{BufferDevice, BufferId, CopyOp, DumbBuffer, MemoryDevice, MemoryDeviceError};
pub use error::{Error, LayoutError};
pub use format::{FormatInfo, MAX_PLANES, PixelFormat, drawable_formats};
pub use framebuffer::Framebuffer;
pub use layout::{BufferGeometry, compute_layout};
pub use surface::{DrawSurface, ShadowKind, SurfaceEncoding, SurfaceState};
pub use tiling::{HardwareGen, TileSize, TilingCaps, TilingMode, tile_size};
