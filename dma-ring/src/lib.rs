//! Firmware-agnostic DMA memory provider for ring-buffer drivers.
//!
//! Device rings want one contiguous, page-aligned, zeroed region that both
//! the CPU and the device can address. This crate hands out such regions
//! from either a compiled-in static pool or an externally supplied memory
//! range, without assuming any firmware or OS services.
//!
//! # Memory Sources
//!
//! 1. **Static pool**: compile-time allocated (simplest, always works)
//! 2. **External**: caller provides an identity-mapped region (e.g. from
//!    firmware or a platform memory map)
//!
//! # Usage
//!
//! ```ignore
//! use dma_ring::RingPool;
//!
//! RingPool::init_static();
//!
//! // One combined region for a TX ring and an RX ring
//! let bytes = dma_ring::ring_region_bytes(2048, 256, 2);
//! let (bus_addr, cpu_ptr) = RingPool::alloc_bytes(bytes)?;
//! ```

#![no_std]

use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Page size (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Default static pool size (2MB) - enough for two 512KB rings plus slack.
pub const DEFAULT_POOL_SIZE: usize = 2 * 1024 * 1024;

/// Minimum usable external region size (64KB).
pub const MIN_REGION_SIZE: usize = 64 * 1024;

/// Align a value up to the given alignment.
#[inline]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Align a value down to the given alignment.
#[inline]
pub const fn align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

/// Bytes needed for `rings` rings of `slots` slots of `slot_size` bytes,
/// rounded up to whole pages.
#[inline]
pub const fn ring_region_bytes(slot_size: usize, slots: usize, rings: usize) -> usize {
    align_up(slot_size * slots * rings, PAGE_SIZE)
}

/// A memory region suitable for DMA.
#[derive(Debug, Clone, Copy)]
pub struct MemoryRegion {
    /// Base address (physical = virtual in identity mapping).
    pub base: usize,
    /// Size in bytes.
    pub size: usize,
}

impl MemoryRegion {
    /// Create a new memory region.
    pub const fn new(base: usize, size: usize) -> Self {
        Self { base, size }
    }

    /// Check if region is usable for DMA (page-aligned, large enough).
    pub fn is_usable(&self) -> bool {
        self.base % PAGE_SIZE == 0 && self.size >= MIN_REGION_SIZE
    }

    /// Get aligned region.
    pub fn aligned(&self) -> Self {
        let aligned_base = align_up(self.base, PAGE_SIZE);
        let adjustment = aligned_base - self.base;
        let aligned_size = align_down(self.size.saturating_sub(adjustment), PAGE_SIZE);
        Self {
            base: aligned_base,
            size: aligned_size,
        }
    }
}

/// DMA pool errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaError {
    /// Pool not initialized.
    NotInitialized,
    /// Requested 0 bytes.
    ZeroBytes,
    /// Not enough memory in pool.
    OutOfMemory,
    /// Pool already initialized.
    AlreadyInitialized,
    /// Invalid memory region.
    InvalidRegion,
}

/// Result type for DMA operations.
pub type Result<T> = core::result::Result<T, DmaError>;

/// Page-aligned static storage (fallback).
#[repr(C, align(4096))]
struct StaticStorage {
    data: [u8; DEFAULT_POOL_SIZE],
}

static mut STATIC_STORAGE: StaticStorage = StaticStorage {
    data: [0u8; DEFAULT_POOL_SIZE],
};

/// Global pool state.
struct PoolState {
    /// Base address of current pool.
    base: AtomicUsize,
    /// Size of current pool.
    size: AtomicUsize,
    /// Bump allocator offset.
    offset: AtomicUsize,
}

static POOL: PoolState = PoolState {
    base: AtomicUsize::new(0),
    size: AtomicUsize::new(0),
    offset: AtomicUsize::new(0),
};

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static LOCK: AtomicBool = AtomicBool::new(false);

#[inline]
fn lock() {
    while LOCK
        .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_err()
    {
        core::hint::spin_loop();
    }
}

#[inline]
fn unlock() {
    LOCK.store(false, Ordering::Release);
}

/// Global DMA ring pool.
///
/// A singleton bump allocator over one region. Rings live for the life of
/// the device, so individual free is not supported; `reset` reclaims
/// everything once all users are gone.
pub struct RingPool;

impl RingPool {
    /// Initialize with the built-in static storage.
    pub fn init_static() {
        if INITIALIZED.swap(true, Ordering::SeqCst) {
            return;
        }

        // SAFETY: Single-threaded init
        unsafe {
            let base = STATIC_STORAGE.data.as_mut_ptr() as usize;
            core::ptr::write_bytes(STATIC_STORAGE.data.as_mut_ptr(), 0, DEFAULT_POOL_SIZE);
            POOL.base.store(base, Ordering::SeqCst);
            POOL.size.store(DEFAULT_POOL_SIZE, Ordering::SeqCst);
        }
    }

    /// Initialize with an externally-provided memory region.
    ///
    /// # Safety
    ///
    /// - `base` must be a valid, page-aligned physical address.
    /// - The region must be identity-mapped (phys == virt).
    /// - The region must not be used by anything else.
    /// - The region must remain valid for the lifetime of the program.
    pub unsafe fn init_external(base: usize, size: usize) -> Result<()> {
        if INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(DmaError::AlreadyInitialized);
        }

        let region = MemoryRegion::new(base, size);
        if !region.is_usable() {
            INITIALIZED.store(false, Ordering::SeqCst);
            return Err(DmaError::InvalidRegion);
        }

        let aligned = region.aligned();
        core::ptr::write_bytes(aligned.base as *mut u8, 0, aligned.size);
        POOL.base.store(aligned.base, Ordering::SeqCst);
        POOL.size.store(aligned.size, Ordering::SeqCst);
        Ok(())
    }

    /// Check if the pool is initialized.
    #[inline]
    pub fn is_initialized() -> bool {
        INITIALIZED.load(Ordering::SeqCst)
    }

    /// Allocate a zeroed, page-aligned region of at least `bytes` bytes.
    ///
    /// Returns (bus_address, cpu_pointer). Identity mapping makes the two
    /// numerically equal, but callers must not rely on that.
    pub fn alloc_bytes(bytes: usize) -> Result<(usize, NonNull<u8>)> {
        if !Self::is_initialized() {
            return Err(DmaError::NotInitialized);
        }
        if bytes == 0 {
            return Err(DmaError::ZeroBytes);
        }

        let size = align_up(bytes, PAGE_SIZE);
        let pool_size = POOL.size.load(Ordering::Relaxed);

        lock();

        let offset = POOL.offset.load(Ordering::Relaxed);
        let aligned_offset = align_up(offset, PAGE_SIZE);
        let new_offset = aligned_offset + size;

        if new_offset > pool_size {
            unlock();
            return Err(DmaError::OutOfMemory);
        }

        POOL.offset.store(new_offset, Ordering::SeqCst);

        unlock();

        let base = POOL.base.load(Ordering::Relaxed);
        let paddr = base + aligned_offset;
        let vaddr_ptr = paddr as *mut u8;

        // Zero the memory
        unsafe {
            core::ptr::write_bytes(vaddr_ptr, 0, size);
        }

        let vaddr = NonNull::new(vaddr_ptr).ok_or(DmaError::OutOfMemory)?;
        Ok((paddr, vaddr))
    }

    /// Get remaining free space in bytes.
    pub fn free_space() -> usize {
        if !Self::is_initialized() {
            return 0;
        }
        let size = POOL.size.load(Ordering::Relaxed);
        let offset = POOL.offset.load(Ordering::Relaxed);
        size.saturating_sub(offset)
    }

    /// Get total pool size in bytes.
    pub fn total_size() -> usize {
        POOL.size.load(Ordering::Relaxed)
    }

    /// Get pool base address.
    pub fn base_address() -> usize {
        POOL.base.load(Ordering::Relaxed)
    }

    /// Reset the allocator.
    ///
    /// # Safety
    ///
    /// All previous allocations must be abandoned first.
    pub unsafe fn reset() {
        lock();
        POOL.offset.store(0, Ordering::SeqCst);
        unlock();
    }
}

// SAFETY: Pool uses atomic operations and spinlock
unsafe impl Sync for PoolState {}
unsafe impl Send for PoolState {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_functions() {
        assert_eq!(align_up(0, 4096), 0);
        assert_eq!(align_up(1, 4096), 4096);
        assert_eq!(align_up(4096, 4096), 4096);
        assert_eq!(align_down(4097, 4096), 4096);
    }

    #[test]
    fn test_ring_region_bytes() {
        // Two rings of 256 x 2KB slots: exactly 1MB, already page-sized.
        assert_eq!(ring_region_bytes(2048, 256, 2), 1024 * 1024);
        // Odd sizes round up to a whole page.
        assert_eq!(ring_region_bytes(100, 3, 1), PAGE_SIZE);
    }

    #[test]
    fn test_memory_region() {
        let region = MemoryRegion::new(4096, 65536);
        assert!(region.is_usable());

        let small = MemoryRegion::new(4096, 1024);
        assert!(!small.is_usable());
    }

    #[test]
    fn test_static_pool_alloc() {
        RingPool::init_static();
        let (paddr, vaddr) = RingPool::alloc_bytes(PAGE_SIZE).unwrap();
        assert_eq!(paddr % PAGE_SIZE, 0);
        assert_eq!(paddr, vaddr.as_ptr() as usize);
        assert!(RingPool::free_space() < RingPool::total_size());
    }
}
