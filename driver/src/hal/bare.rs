//! Bare-metal platform for identity-mapped environments.
//!
//! Registers are accessed in place (phys == virt), DMA memory comes from
//! the `dma-ring` static pool, and time comes from the TSC with a
//! caller-supplied calibration. Interrupt-line routing is board wiring:
//! the board's vector entry fetches the bridge from the handle
//! (`EthIpCore::irq_bridge`) and invokes it; mask/unmask are controller
//! operations this platform cannot do generically and leaves to that same
//! wiring.

use dma_ring::RingPool;

use super::{DmaRegion, MmioWindow, Platform};
use crate::irq::IrqBridge;
use crate::regs::MmioRegisters;

/// Platform backed by the static DMA pool and identity-mapped MMIO.
pub struct StaticPlatform {
    tsc_per_ms: u64,
    line: Option<u32>,
}

impl StaticPlatform {
    /// Create a platform with a calibrated TSC frequency (ticks per
    /// millisecond). Initializes the static DMA pool on first use.
    pub fn new(tsc_per_ms: u64) -> Self {
        RingPool::init_static();
        Self {
            tsc_per_ms,
            line: None,
        }
    }

    /// The interrupt line currently claimed, if any.
    pub fn claimed_line(&self) -> Option<u32> {
        self.line
    }
}

impl Platform for StaticPlatform {
    type Regs = MmioRegisters;
    type Error = dma_ring::DmaError;

    fn map_registers(&mut self, window: MmioWindow) -> Result<Self::Regs, Self::Error> {
        // Identity mapping: the physical window is already addressable.
        // SAFETY: caller of init vouches for the window address.
        Ok(unsafe { MmioRegisters::new(window.base) })
    }

    fn unmap_registers(&mut self, _regs: Self::Regs, _window: MmioWindow) {}

    fn alloc_dma(&mut self, bytes: usize) -> Result<DmaRegion, Self::Error> {
        let (bus, cpu) = RingPool::alloc_bytes(bytes)?;
        Ok(DmaRegion {
            cpu,
            bus: bus as u64,
            len: dma_ring::align_up(bytes, dma_ring::PAGE_SIZE),
        })
    }

    fn free_dma(&mut self, _region: DmaRegion) {
        // Bump pool: rings live for the device lifetime, reclaim is a
        // whole-pool reset done by the board between device generations.
    }

    fn claim_irq(
        &mut self,
        line: u32,
        _bridge: IrqBridge<Self::Regs>,
    ) -> Result<(), Self::Error> {
        // Vector wiring is board code; the bridge is re-fetched from the
        // handle there. Recording the line keeps release symmetric.
        self.line = Some(line);
        Ok(())
    }

    fn release_irq(&mut self, line: u32) {
        if self.line == Some(line) {
            self.line = None;
        }
    }

    fn mask_irq(&mut self, _line: u32) {}

    fn unmask_irq(&mut self, _line: u32) {}

    fn now(&self) -> u64 {
        read_tsc()
    }

    fn ticks_per_ms(&self) -> u64 {
        self.tsc_per_ms
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn read_tsc() -> u64 {
    // SAFETY: rdtsc has no memory effects.
    unsafe { core::arch::x86_64::_rdtsc() }
}

// Stub for non-x86_64 platforms
#[cfg(not(target_arch = "x86_64"))]
#[inline]
fn read_tsc() -> u64 {
    0
}
