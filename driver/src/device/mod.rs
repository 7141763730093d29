//! Core device handle.
//!
//! [`EthIpCore`] is the one owner of everything the IP core protocol
//! needs: the register view, the ring memory, the cached cursors, the wake
//! flag, and the claimed interrupt line. It is built by [`EthIpCore::init`]
//! and released by [`EthIpCore::exit`] (or drop); exactly one handle exists
//! per hardware instance.
//!
//! The protocol paths take `&mut self` and use no internal locking: the TX
//! and RX cursor state is disjoint, and the only thing shared with the
//! interrupt context is the wake flag.

mod init;
mod rx;
mod tx;

use alloc::sync::Arc;

use crate::dma::RingMemory;
use crate::hal::{MmioWindow, Platform};
use crate::irq::{IrqBridge, WakeFlag};
use crate::regs::WINDOW_BYTES;
use crate::ring::Cursors;

/// Hardware location and protocol tuning.
#[derive(Debug, Clone, Copy)]
pub struct CoreConfig {
    /// MMIO register window.
    pub mmio: MmioWindow,
    /// Interrupt line wired to the core.
    pub irq_line: u32,
    /// Bound on the blocking receive wait, in milliseconds.
    pub rx_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            mmio: MmioWindow {
                base: 0x8000_0000,
                bytes: WINDOW_BYTES,
            },
            irq_line: 186,
            rx_timeout_ms: 1000,
        }
    }
}

/// Owned handle to one IP core instance.
pub struct EthIpCore<P: Platform> {
    platform: P,
    cfg: CoreConfig,
    regs: Option<P::Regs>,
    mem: Option<RingMemory>,
    irq_line: Option<u32>,
    wake: Arc<WakeFlag>,
    tx: Cursors,
    rx: Cursors,
}

impl<P: Platform> core::fmt::Debug for EthIpCore<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EthIpCore")
            .field("cfg", &self.cfg)
            .field("irq_line", &self.irq_line)
            .field("tx", &self.tx)
            .field("rx", &self.rx)
            .finish_non_exhaustive()
    }
}

impl<P: Platform> EthIpCore<P> {
    /// Active configuration.
    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// The owned platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Mutable access to the owned platform.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Handler endpoint for board interrupt wiring. `None` before init
    /// completes or after teardown.
    pub fn irq_bridge(&self) -> Option<IrqBridge<P::Regs>> {
        self.regs
            .as_ref()
            .map(|regs| IrqBridge::new(regs.clone(), self.wake.clone()))
    }

    /// Release a blocked (or future) `receive_frame` immediately. Sticky;
    /// used on the shutdown path so the receive loop never has to ride out
    /// the timeout.
    pub fn cancel_receive(&self) {
        self.wake.cancel();
    }

    /// Cached TX cursor pair (diagnostics).
    pub fn tx_cursors(&self) -> Cursors {
        self.tx
    }

    /// Cached RX cursor pair (diagnostics).
    pub fn rx_cursors(&self) -> Cursors {
        self.rx
    }
}
