//! Platform abstraction.
//!
//! Everything the driver needs from its environment sits behind the
//! [`Platform`] trait: mapping the register window, DMA-capable memory,
//! the interrupt line, and a monotonic tick clock for the bounded receive
//! wait. The driver core is generic over it, so the same protocol code
//! runs against real hardware ([`bare::StaticPlatform`]) and against the
//! simulated register file ([`sim::SimPlatform`]) in tests.

pub mod bare;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

use core::fmt;
use core::ptr::NonNull;

use crate::irq::IrqBridge;
use crate::regs::Registers;

/// A physical MMIO window to reserve and map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmioWindow {
    /// Physical base address.
    pub base: u64,
    /// Window size in bytes.
    pub bytes: usize,
}

/// A DMA-capable memory region: CPU pointer plus the bus address the
/// device sees.
#[derive(Debug, Clone, Copy)]
pub struct DmaRegion {
    /// CPU-accessible pointer to the region.
    pub cpu: NonNull<u8>,
    /// Device-visible bus address.
    pub bus: u64,
    /// Region length in bytes.
    pub len: usize,
}

// SAFETY: the region describes memory, it does not borrow it; exclusive use
// is enforced by whoever owns the region value.
unsafe impl Send for DmaRegion {}

/// Host environment services the driver core depends on.
pub trait Platform {
    /// Register-file view this platform produces.
    type Regs: Registers + Clone + Send + Sync;
    /// Platform-specific failure detail (logged, then mapped to `InitError`).
    type Error: fmt::Debug;

    /// Reserve and map the MMIO register window.
    fn map_registers(&mut self, window: MmioWindow) -> Result<Self::Regs, Self::Error>;

    /// Unmap and release a previously mapped window.
    fn unmap_registers(&mut self, regs: Self::Regs, window: MmioWindow);

    /// Allocate a zeroed DMA-capable region of at least `bytes` bytes.
    fn alloc_dma(&mut self, bytes: usize) -> Result<DmaRegion, Self::Error>;

    /// Free a region from [`Platform::alloc_dma`].
    fn free_dma(&mut self, region: DmaRegion);

    /// Claim an interrupt line and bind the handler endpoint to it.
    fn claim_irq(&mut self, line: u32, bridge: IrqBridge<Self::Regs>)
        -> Result<(), Self::Error>;

    /// Release a claimed line.
    fn release_irq(&mut self, line: u32);

    /// Mask the line at the interrupt-controller level.
    fn mask_irq(&mut self, line: u32);

    /// Unmask the line at the interrupt-controller level.
    fn unmask_irq(&mut self, line: u32);

    /// Monotonic tick counter.
    fn now(&self) -> u64;

    /// Ticks per millisecond of the counter.
    fn ticks_per_ms(&self) -> u64;

    /// Pause hint inside a bounded wait loop.
    fn relax(&mut self) {
        core::hint::spin_loop();
    }
}
