//! Tiling modes and hardware tile geometry
//!
//! Tiling rearranges pixel rows into cache-friendly blocks. For layout
//! purposes only the tile's byte width and line height matter: strides must
//! be a multiple of the tile width and plane heights round up to the tile
//! height. Which geometry applies depends on the tiling mode, the hardware
//! generation, and (for Yf) the plane's bits per pixel.
//!
//! Generation-dependent rules are looked up once through a capability table
//! ([`HardwareGen::caps`]) rather than branched on at every use site.
//!
//! ## Example
//!
//! ```
//! use fbkit::{tile_size, HardwareGen, TilingMode};
//!
//! let hw_gen = HardwareGen::new(9);
//! let tile = tile_size(TilingMode::Y, 32, hw_gen)?;
//! assert_eq!((tile.width, tile.height), (128, 32));
//!
//! // Untiled buffers degrade to plain 64-byte row alignment.
//! let tile = tile_size(TilingMode::None, 32, hw_gen)?;
//! assert_eq!((tile.width, tile.height), (64, 1));
//! # Ok::<(), fbkit::LayoutError>(())
//! ```

use crate::error::LayoutError;

/// Hardware tiling layout of a buffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TilingMode {
    /// Linear (untiled) layout
    #[default]
    None,
    /// X-major tiling
    X,
    /// Y-major tiling
    Y,
    /// Yf tiling (tile geometry depends on bits per pixel)
    Yf,
}

impl TilingMode {
    /// Whether this mode requires the detile copy path for CPU drawing
    ///
    /// X-tiled buffers stay CPU-drawable through the mapping aperture;
    /// Y and Yf do not.
    pub fn needs_detile(self) -> bool {
        matches!(self, Self::Y | Self::Yf)
    }
}

/// Hardware generation descriptor
///
/// Identifies the tiling-rule family a device belongs to. `family_915`
/// marks the 915-class devices whose Y tiling uses the X-tile geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardwareGen {
    /// Major generation number
    pub major: u32,
    /// 915-class display family
    pub family_915: bool,
}

/// Tile dimensions: byte width and line height
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileSize {
    /// Tile width in bytes
    pub width: u32,
    /// Tile height in lines
    pub height: u32,
}

/// Tiling capabilities of one hardware generation
///
/// Resolved once per layout computation; callers consume the geometry and
/// the fence-emulation flag as plain data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilingCaps {
    /// X-tile geometry
    pub x_tile: TileSize,
    /// Y-tile geometry
    pub y_tile: TileSize,
    /// Whether tiled allocations must use power-of-two fence rounding
    pub fence_emulation: bool,
}

impl HardwareGen {
    /// Create a descriptor for a generation outside the 915 family
    pub fn new(major: u32) -> Self {
        Self {
            major,
            family_915: false,
        }
    }

    /// Create a descriptor for a 915-class generation-3 device
    pub fn gen3_915() -> Self {
        Self {
            major: 3,
            family_915: true,
        }
    }

    /// Resolve this generation's tiling capabilities
    pub fn caps(self) -> TilingCaps {
        let x_tile = if self.major == 2 {
            TileSize {
                width: 128,
                height: 16,
            }
        } else {
            TileSize {
                width: 512,
                height: 8,
            }
        };

        let y_tile = if self.major == 2 {
            TileSize {
                width: 128,
                height: 16,
            }
        } else if self.family_915 {
            TileSize {
                width: 512,
                height: 8,
            }
        } else {
            TileSize {
                width: 128,
                height: 32,
            }
        };

        TilingCaps {
            x_tile,
            y_tile,
            // Generations up to 3 lack native tiled-stride flexibility and
            // need power-of-two fence regions.
            fence_emulation: self.major <= 3,
        }
    }
}

/// Resolve the tile geometry for a tiling mode, plane bpp, and generation
///
/// Untiled buffers report a 64x1 "tile" so the layout math degenerates to
/// simple byte alignment. Yf geometry is bucketed strictly by bits per
/// pixel and ignores the generation.
///
/// # Errors
///
/// Returns [`LayoutError::UnsupportedTileBpp`] for a Yf request with a bpp
/// outside the supported buckets. Never partially succeeds.
pub fn tile_size(tiling: TilingMode, bpp: u32, hw_gen: HardwareGen) -> Result<TileSize, LayoutError> {
    match tiling {
        TilingMode::None => Ok(TileSize {
            width: 64,
            height: 1,
        }),
        TilingMode::X => Ok(hw_gen.caps().x_tile),
        TilingMode::Y => Ok(hw_gen.caps().y_tile),
        TilingMode::Yf => match bpp {
            8 => Ok(TileSize {
                width: 64,
                height: 64,
            }),
            16 | 32 => Ok(TileSize {
                width: 128,
                height: 32,
            }),
            64 | 128 => Ok(TileSize {
                width: 256,
                height: 16,
            }),
            _ => Err(LayoutError::UnsupportedTileBpp { bpp }),
        },
    }
}
