//! Buffer device abstraction
//!
//! This module provides the [`BufferDevice`] trait over the allocation
//! backend and the [`MemoryDevice`] software implementation.
//!
//! The library never talks to a kernel directly; it consumes five opaque
//! primitives: allocate, map, blit-copy (with tiling conversion),
//! synchronize, and a dirty/flush notification for CPU-only storage. Any
//! backend that provides those (an ioctl wrapper around a real DRM device, or the
//! in-memory device below) can host framebuffers.
//!
//! Mappings are owned values checked out of the device and checked back in.
//! Checking out corresponds to moving the buffer into the CPU domain (the
//! implementation must wait for outstanding device writes first); checking
//! in returns it to the device domain.
//!
//! ## Example
//!
//! ```
//! use fbkit::{BufferDevice, MemoryDevice};
//!
//! let mut dev = MemoryDevice::new();
//! let id = dev.create(4096)?;
//!
//! let mut map = dev.map(id)?;
//! map[0] = 0xAB;
//! dev.unmap(id, map)?;
//!
//! assert_eq!(dev.data(id)?[0], 0xAB);
//! # Ok::<(), fbkit::MemoryDeviceError>(())
//! ```

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::tiling::TilingMode;

/// Opaque handle to a device buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Result of a dumb-buffer allocation
///
/// Dumb buffers are CPU-mappable allocations without device tiling
/// capability; the device chooses their pitch and size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DumbBuffer {
    /// Handle of the allocation
    pub id: BufferId,
    /// Pitch chosen by the device (may exceed `width * bpp / 8`)
    pub stride: u32,
    /// Total size chosen by the device
    pub size: u64,
}

/// Parameters of one blit copy
///
/// Describes a `width` x `height` pixel rectangle copied from the source
/// buffer to the destination buffer, each side with its own byte offset,
/// stride, and tiling layout. The device converts between the layouts
/// during the copy.
#[derive(Clone, Copy, Debug)]
pub struct CopyOp {
    /// Source buffer
    pub src: BufferId,
    /// Byte offset of the source plane
    pub src_offset: u64,
    /// Source stride in bytes
    pub src_stride: u32,
    /// Source tiling layout
    pub src_tiling: TilingMode,
    /// Destination buffer
    pub dst: BufferId,
    /// Byte offset of the destination plane
    pub dst_offset: u64,
    /// Destination stride in bytes
    pub dst_stride: u32,
    /// Destination tiling layout
    pub dst_tiling: TilingMode,
    /// Rectangle width in pixels
    pub width: u32,
    /// Rectangle height in lines
    pub height: u32,
    /// Bits per pixel of the copied plane
    pub bpp: u32,
}

/// Trait for the buffer allocation and copy backend
///
/// All operations are synchronous. None of them retries: the first failure
/// is surfaced to the caller, who treats it as a test-environment fault.
pub trait BufferDevice {
    /// Error type for device operations
    type Error: Debug;
    /// Owned CPU mapping of a buffer
    type Mapping: AsRef<[u8]> + AsMut<[u8]>;

    /// Allocate a buffer of `size` bytes, zero-filled
    fn create(&mut self, size: u64) -> Result<BufferId, Self::Error>;

    /// Allocate a dumb (CPU-only) buffer
    ///
    /// The device picks the pitch and total size and reports them in the
    /// returned [`DumbBuffer`]. The storage is zero-filled.
    fn create_dumb(&mut self, width: u32, height: u32, bpp: u32)
    -> Result<DumbBuffer, Self::Error>;

    /// Map a buffer for CPU access
    ///
    /// The implementation must block until any outstanding device-side
    /// writes to the buffer have completed before returning the mapping.
    fn map(&mut self, id: BufferId) -> Result<Self::Mapping, Self::Error>;

    /// Return a mapping to the device domain
    ///
    /// After this call the buffer contents reflect every write made through
    /// the mapping.
    fn unmap(&mut self, id: BufferId, mapping: Self::Mapping) -> Result<(), Self::Error>;

    /// Copy a pixel rectangle between buffers, converting tiling layouts
    ///
    /// Completion is signalled separately: callers must [`sync`](Self::sync)
    /// the destination before treating its contents as valid.
    fn blit(&mut self, op: &CopyOp) -> Result<(), Self::Error>;

    /// Block until all device work on the buffer has completed
    fn sync(&mut self, id: BufferId) -> Result<(), Self::Error>;

    /// Notify the device that CPU writes to a dumb buffer must be flushed
    fn dirty(&mut self, id: BufferId) -> Result<(), Self::Error>;

    /// Release a buffer
    fn destroy(&mut self, id: BufferId) -> Result<(), Self::Error>;
}

/// Errors reported by [`MemoryDevice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryDeviceError {
    /// No buffer exists with this handle
    UnknownBuffer(BufferId),
    /// The buffer is checked out to the CPU domain
    BufferMapped(BufferId),
    /// The allocation does not fit the host address space
    AllocationTooLarge {
        /// Requested size in bytes
        size: u64,
    },
    /// A blit rectangle reaches past the end of a buffer
    CopyOutOfBounds {
        /// The buffer the rectangle overruns
        buffer: BufferId,
    },
    /// The mapping returned at unmap does not match the buffer
    MappingSizeMismatch {
        /// Buffer size in bytes
        expected: usize,
        /// Returned mapping length
        provided: usize,
    },
}

impl core::fmt::Display for MemoryDeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownBuffer(id) => write!(f, "unknown buffer {}", id.0),
            Self::BufferMapped(id) => write!(f, "buffer {} is mapped", id.0),
            Self::AllocationTooLarge { size } => {
                write!(f, "allocation of {size} bytes too large")
            }
            Self::CopyOutOfBounds { buffer } => {
                write!(f, "copy rectangle overruns buffer {}", buffer.0)
            }
            Self::MappingSizeMismatch { expected, provided } => {
                write!(
                    f,
                    "mapping is {provided} bytes, buffer is {expected} bytes"
                )
            }
        }
    }
}

impl core::error::Error for MemoryDeviceError {}

#[derive(Debug)]
struct Slot {
    /// Buffer contents; `None` while checked out to the CPU domain
    bytes: Option<Vec<u8>>,
    len: usize,
}

/// Software buffer device backed by host memory
///
/// Implements [`BufferDevice`] without hardware: buffers are plain byte
/// vectors, mapping moves a vector out of the device and unmapping moves it
/// back, and blits are row-by-row stride-converting copies. Tiling
/// rearrangement affects only alignment requirements, never pixel values,
/// so the software copy accepts the tiling tags without reordering bytes.
///
/// Suitable for harnesses running without a real device, and as the test
/// backend for this library.
#[derive(Debug, Default)]
pub struct MemoryDevice {
    buffers: BTreeMap<u32, Slot>,
    dirty_log: Vec<BufferId>,
    next_id: u32,
}

impl MemoryDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect a buffer's current contents
    ///
    /// Intended for harness verification after a surface release.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unknown or the buffer is currently mapped.
    pub fn data(&self, id: BufferId) -> Result<&[u8], MemoryDeviceError> {
        let slot = self
            .buffers
            .get(&id.0)
            .ok_or(MemoryDeviceError::UnknownBuffer(id))?;
        slot.bytes
            .as_deref()
            .ok_or(MemoryDeviceError::BufferMapped(id))
    }

    /// Buffers that received a dirty/flush notification, in call order
    pub fn dirty_log(&self) -> &[BufferId] {
        &self.dirty_log
    }

    /// Number of live buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn alloc(&mut self, size: u64) -> Result<BufferId, MemoryDeviceError> {
        let len =
            usize::try_from(size).map_err(|_| MemoryDeviceError::AllocationTooLarge { size })?;
        let id = BufferId(self.next_id);
        self.next_id += 1;
        self.buffers.insert(
            id.0,
            Slot {
                bytes: Some(vec![0; len]),
                len,
            },
        );
        Ok(id)
    }

    fn slot_mut(&mut self, id: BufferId) -> Result<&mut Slot, MemoryDeviceError> {
        self.buffers
            .get_mut(&id.0)
            .ok_or(MemoryDeviceError::UnknownBuffer(id))
    }

    fn copy_bounds(
        op: &CopyOp,
        row_len: usize,
        stride: u32,
        offset: u64,
        len: usize,
        buffer: BufferId,
    ) -> Result<(), MemoryDeviceError> {
        if op.height == 0 {
            return Ok(());
        }
        let last_row = offset + u64::from(op.height - 1) * u64::from(stride);
        let end = last_row + row_len as u64;
        if end > len as u64 {
            return Err(MemoryDeviceError::CopyOutOfBounds { buffer });
        }
        Ok(())
    }
}

impl BufferDevice for MemoryDevice {
    type Error = MemoryDeviceError;
    type Mapping = Vec<u8>;

    fn create(&mut self, size: u64) -> Result<BufferId, Self::Error> {
        self.alloc(size)
    }

    fn create_dumb(
        &mut self,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<DumbBuffer, Self::Error> {
        // Dumb pitch rule: byte width rounded up to 64 bytes.
        let stride = (width * (bpp / 8) + 63) & !63;
        let size = u64::from(stride) * u64::from(height);
        let id = self.alloc(size)?;
        Ok(DumbBuffer { id, stride, size })
    }

    fn map(&mut self, id: BufferId) -> Result<Self::Mapping, Self::Error> {
        let slot = self.slot_mut(id)?;
        slot.bytes.take().ok_or(MemoryDeviceError::BufferMapped(id))
    }

    fn unmap(&mut self, id: BufferId, mapping: Self::Mapping) -> Result<(), Self::Error> {
        let slot = self.slot_mut(id)?;
        if slot.bytes.is_some() {
            // Not checked out; the caller is returning a mapping we never
            // handed over.
            return Err(MemoryDeviceError::BufferMapped(id));
        }
        if mapping.len() != slot.len {
            return Err(MemoryDeviceError::MappingSizeMismatch {
                expected: slot.len,
                provided: mapping.len(),
            });
        }
        slot.bytes = Some(mapping);
        Ok(())
    }

    fn blit(&mut self, op: &CopyOp) -> Result<(), Self::Error> {
        log::trace!(
            "blit {}+{:#x} ({:?}) -> {}+{:#x} ({:?}), {}x{}@{}",
            op.src.0,
            op.src_offset,
            op.src_tiling,
            op.dst.0,
            op.dst_offset,
            op.dst_tiling,
            op.width,
            op.height,
            op.bpp
        );

        let row_len = (op.width as usize) * (op.bpp as usize) / 8;

        let src_slot = self
            .buffers
            .get(&op.src.0)
            .ok_or(MemoryDeviceError::UnknownBuffer(op.src))?;
        let src = src_slot
            .bytes
            .as_ref()
            .ok_or(MemoryDeviceError::BufferMapped(op.src))?;
        Self::copy_bounds(op, row_len, op.src_stride, op.src_offset, src.len(), op.src)?;

        // Row-by-row copy through a staging vector; source and destination
        // may be the same buffer.
        let mut staged = Vec::with_capacity(row_len * op.height as usize);
        for row in 0..op.height {
            let start = (op.src_offset + u64::from(row) * u64::from(op.src_stride)) as usize;
            staged.extend_from_slice(&src[start..start + row_len]);
        }

        let dst_slot = self
            .buffers
            .get_mut(&op.dst.0)
            .ok_or(MemoryDeviceError::UnknownBuffer(op.dst))?;
        let dst_len = dst_slot.len;
        let dst = dst_slot
            .bytes
            .as_mut()
            .ok_or(MemoryDeviceError::BufferMapped(op.dst))?;
        Self::copy_bounds(op, row_len, op.dst_stride, op.dst_offset, dst_len, op.dst)?;

        for row in 0..op.height {
            let start = (op.dst_offset + u64::from(row) * u64::from(op.dst_stride)) as usize;
            let staged_start = row as usize * row_len;
            dst[start..start + row_len]
                .copy_from_slice(&staged[staged_start..staged_start + row_len]);
        }

        Ok(())
    }

    fn sync(&mut self, id: BufferId) -> Result<(), Self::Error> {
        // Software copies complete synchronously; only validate the handle.
        self.slot_mut(id).map(|_| ())
    }

    fn dirty(&mut self, id: BufferId) -> Result<(), Self::Error> {
        self.slot_mut(id)?;
        self.dirty_log.push(id);
        Ok(())
    }

    fn destroy(&mut self, id: BufferId) -> Result<(), Self::Error> {
        let slot = self
            .buffers
            .get(&id.0)
            .ok_or(MemoryDeviceError::UnknownBuffer(id))?;
        if slot.bytes.is_none() {
            return Err(MemoryDeviceError::BufferMapped(id));
        }
        self.buffers.remove(&id.0);
        Ok(())
    }
}
