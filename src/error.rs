//! Error types for the library
//!
//! This module defines error types for the pure layout queries
//! ([`LayoutError`]) and for operations that touch the buffer device
//! ([`Error`]).
//!
//! Every error here is fatal from the consumer's point of view: the library
//! serves correctness tests, and a failed precondition means the test itself
//! is invalid. The types exist so a harness can abort with a precise
//! diagnosis rather than a generic one.
//!
//! ## Example
//!
//! ```
//! use fbkit::{LayoutError, PixelFormat};
//!
//! // No catalog entry matches a 24-bit packed format.
//! let result = PixelFormat::from_bpp_depth(24, 24);
//! assert!(matches!(result, Err(LayoutError::UnknownBppDepth { .. })));
//! ```

use crate::device::{BufferDevice, BufferId};

/// Errors from the pure format and layout queries
///
/// These never involve a device and are reported with the offending input
/// values so the failing combination can be read straight off the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// The fourcc code has no catalog entry
    ///
    /// All supported formats are known at compile time; asking for anything
    /// else is a caller bug.
    UnknownFourcc {
        /// The rejected fourcc code
        fourcc: u32,
    },
    /// No catalog entry matches the bpp/depth pair
    UnknownBppDepth {
        /// Requested bits per pixel
        bpp: u32,
        /// Requested color depth
        depth: i32,
    },
    /// Yf tiling was requested with a bits-per-pixel value outside the
    /// supported buckets (8, 16, 32, 64, 128)
    UnsupportedTileBpp {
        /// The rejected bits-per-pixel value
        bpp: u32,
    },
}

impl core::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownFourcc { fourcc } => {
                write!(f, "unknown pixel format {fourcc:#010x}")
            }
            Self::UnknownBppDepth { bpp, depth } => {
                write!(f, "no pixel format with bpp={bpp}, depth={depth}")
            }
            Self::UnsupportedTileBpp { bpp } => {
                write!(f, "no Yf tile geometry for {bpp} bpp")
            }
        }
    }
}

impl core::error::Error for LayoutError {}

/// Errors that can occur when operating on framebuffers and surfaces
///
/// Generic over the device type to preserve the specific device error.
/// This allows a harness to match on the underlying backend failure.
#[derive(Debug)]
pub enum Error<D: BufferDevice> {
    /// A pure layout query failed
    Layout(LayoutError),
    /// A drawing surface is already active on this framebuffer
    ///
    /// At most one surface may be outstanding per framebuffer; release the
    /// current one before acquiring again. This is a programming error in
    /// the caller.
    SurfaceActive,
    /// No drawing surface is active on this framebuffer
    ///
    /// Releasing (or destroying through) a surface requires one to have been
    /// acquired first. This is a programming error in the caller.
    NoActiveSurface,
    /// The surface being released belongs to a different framebuffer
    ForeignSurface {
        /// Backing buffer of the framebuffer the release was called on
        expected: BufferId,
        /// Backing buffer the surface was acquired from
        provided: BufferId,
    },
    /// Device primitive failure (allocate/map/blit/sync)
    ///
    /// Wraps the underlying backend error from the [`BufferDevice`]
    /// implementation. Surfaced immediately, never retried.
    Device(D::Error),
}

impl<D: BufferDevice> core::fmt::Display for Error<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Layout(e) => write!(f, "layout error: {e}"),
            Self::SurfaceActive => write!(f, "a drawing surface is already active"),
            Self::NoActiveSurface => write!(f, "no drawing surface is active"),
            Self::ForeignSurface { expected, provided } => write!(
                f,
                "surface belongs to buffer {provided:?}, not {expected:?}"
            ),
            Self::Device(e) => write!(f, "device error: {e:?}"),
        }
    }
}

impl<D: BufferDevice + core::fmt::Debug> core::error::Error for Error<D> {}

impl<D: BufferDevice> From<LayoutError> for Error<D> {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}
