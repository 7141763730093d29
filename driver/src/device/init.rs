//! Ordered resource lifecycle.
//!
//! Bring-up acquires in a fixed order (register window, DMA ring buffer,
//! interrupt line, hardware programming) and every step is gated on the
//! one before it. Any failure rolls back whatever was acquired and surfaces
//! the step-specific [`InitError`]. Teardown quiesces the hardware before
//! releasing anything and is idempotent, so a partially built handle and a
//! fully built one release identically.

use alloc::sync::Arc;

use log::{debug, error};

use crate::dma::RingMemory;
use crate::error::InitError;
use crate::hal::Platform;
use crate::irq::{IrqBridge, WakeFlag};
use crate::regs::Registers;
use crate::ring::{Cursors, RING_SLOTS};

use super::{CoreConfig, EthIpCore};

impl<P: Platform> EthIpCore<P> {
    /// Bring the device up.
    ///
    /// On failure the specific step's error is returned and everything
    /// acquired up to that point has already been released.
    pub fn init(platform: P, cfg: CoreConfig) -> Result<Self, InitError> {
        let mut core = Self {
            platform,
            cfg,
            regs: None,
            mem: None,
            irq_line: None,
            wake: Arc::new(WakeFlag::new()),
            tx: Cursors::zeroed(),
            rx: Cursors::zeroed(),
        };

        if let Err(e) = core.acquire() {
            core.teardown();
            return Err(e);
        }
        Ok(core)
    }

    fn acquire(&mut self) -> Result<(), InitError> {
        debug!(
            "axieth: mapping register window at {:#x}",
            self.cfg.mmio.base
        );
        let regs = self.platform.map_registers(self.cfg.mmio).map_err(|e| {
            error!("axieth: register window mapping failed: {:?}", e);
            InitError::RegionMap
        })?;
        self.regs = Some(regs.clone());

        debug!("axieth: allocating {} ring bytes", RingMemory::BYTES);
        let region = self.platform.alloc_dma(RingMemory::BYTES).map_err(|e| {
            error!("axieth: ring buffer allocation failed: {:?}", e);
            InitError::DmaAlloc
        })?;
        match RingMemory::new(region) {
            Some(mem) => self.mem = Some(mem),
            None => {
                error!("axieth: DMA region too small for both rings");
                self.platform.free_dma(region);
                return Err(InitError::DmaAlloc);
            }
        }

        debug!("axieth: claiming interrupt line {}", self.cfg.irq_line);
        let bridge = IrqBridge::new(regs.clone(), self.wake.clone());
        self.platform
            .claim_irq(self.cfg.irq_line, bridge)
            .map_err(|e| {
                error!("axieth: interrupt claim failed: {:?}", e);
                InitError::IrqClaim
            })?;
        self.irq_line = Some(self.cfg.irq_line);
        // Hold the line off until the hardware is programmed.
        self.platform.mask_irq(self.cfg.irq_line);

        // Program the core: wake disarmed, then capacity, then the ring
        // base last; the base write is what starts the DMA engine.
        let bus_base = self.mem.as_ref().ok_or(InitError::DmaAlloc)?.bus_base();
        regs.set_irq_mask(false);
        regs.set_queue_capacity(RING_SLOTS);
        regs.set_queue_base((bus_base & 0xFFFF_FFFF) as u32);
        self.platform.unmask_irq(self.cfg.irq_line);

        debug!("axieth: device ready, {} slots per ring", RING_SLOTS);
        Ok(())
    }

    /// Shut the device down and release every resource.
    ///
    /// The caller must have stopped the receive loop first (see
    /// [`EthIpCore::cancel_receive`]).
    pub fn exit(mut self) {
        debug!("axieth: shutting down");
        self.teardown();
    }

    /// Idempotent release, shared by `exit`, failed init, and drop.
    fn teardown(&mut self) {
        // Quiesce the hardware before touching anything it may still DMA
        // into or interrupt about.
        if let Some(regs) = &self.regs {
            regs.set_irq_mask(false);
            regs.set_queue_base(0);
            regs.set_queue_capacity(0);
        }
        if let Some(line) = self.irq_line.take() {
            self.platform.release_irq(line);
        }
        if let Some(mem) = self.mem.take() {
            let region = mem.into_region();
            self.platform.free_dma(region);
        }
        if let Some(regs) = self.regs.take() {
            self.platform.unmap_registers(regs, self.cfg.mmio);
        }
    }
}

impl<P: Platform> Drop for EthIpCore<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use crate::device::{CoreConfig, EthIpCore};
    use crate::error::InitError;
    use crate::hal::sim::SimPlatform;
    use crate::ring::RING_SLOTS;

    #[test]
    fn test_init_programs_the_core() {
        let sim = SimPlatform::new();
        let core = EthIpCore::init(sim.clone(), CoreConfig::default()).unwrap();

        assert_eq!(sim.queue_capacity(), RING_SLOTS);
        assert_ne!(sim.queue_base(), 0);
        assert!(!sim.mask_armed());
        // The line mask only covers the acquisition window.
        assert!(!sim.line_masked());
        drop(core);
    }

    #[test]
    fn test_exit_quiesces_and_balances() {
        let sim = SimPlatform::new();
        let core = EthIpCore::init(sim.clone(), CoreConfig::default()).unwrap();
        core.exit();

        assert_eq!(sim.queue_base(), 0);
        assert_eq!(sim.queue_capacity(), 0);
        assert!(sim.counters().balanced());
    }

    #[test]
    fn test_drop_is_exit() {
        let sim = SimPlatform::new();
        {
            let _core = EthIpCore::init(sim.clone(), CoreConfig::default()).unwrap();
        }
        assert_eq!(sim.queue_base(), 0);
        assert!(sim.counters().balanced());
    }

    #[test]
    fn test_map_failure_rolls_back_clean() {
        let sim = SimPlatform::new();
        sim.fail_map_registers();
        let err = EthIpCore::init(sim.clone(), CoreConfig::default()).unwrap_err();
        assert_eq!(err, InitError::RegionMap);

        let c = sim.counters();
        assert_eq!(c.maps, 0);
        assert!(c.balanced());
    }

    #[test]
    fn test_alloc_failure_releases_mapping() {
        let sim = SimPlatform::new();
        sim.fail_alloc_dma();
        let err = EthIpCore::init(sim.clone(), CoreConfig::default()).unwrap_err();
        assert_eq!(err, InitError::DmaAlloc);

        let c = sim.counters();
        assert_eq!(c.maps, 1);
        assert_eq!(c.dma_allocs, 0);
        assert!(c.balanced());
    }

    #[test]
    fn test_irq_failure_releases_mapping_and_dma() {
        let sim = SimPlatform::new();
        sim.fail_claim_irq();
        let err = EthIpCore::init(sim.clone(), CoreConfig::default()).unwrap_err();
        assert_eq!(err, InitError::IrqClaim);

        let c = sim.counters();
        assert_eq!(c.maps, 1);
        assert_eq!(c.dma_allocs, 1);
        assert_eq!(c.irq_claims, 0);
        assert!(c.balanced());
    }

    #[test]
    fn test_init_after_failed_init_succeeds() {
        let sim = SimPlatform::new();
        sim.fail_alloc_dma();
        assert!(EthIpCore::init(sim.clone(), CoreConfig::default()).is_err());

        let core = EthIpCore::init(sim.clone(), CoreConfig::default()).unwrap();
        assert_eq!(sim.queue_capacity(), RING_SLOTS);
        core.exit();
        assert!(sim.counters().balanced());
    }
}
