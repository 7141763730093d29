//! Completion/interrupt bridge.
//!
//! The rendezvous between interrupt context and a blocked receiver is a
//! single-slot wake flag. The handler side does the minimum: disarm the
//! device IRQ mask, raise the flag. It never touches ring indices. One
//! receiver waits at a time and the mask is only re-armed by the next
//! blocking receive, so a single slot is enough; a stale signal costs the
//! waiter one extra index read, nothing more.
//!
//! Cancellation is a second, sticky flag: raising it releases a current or
//! future waiter immediately, so shutdown never has to ride out the
//! receive timeout.

use core::sync::atomic::{AtomicBool, Ordering};

use alloc::sync::Arc;

use crate::regs::Registers;

/// Single-slot wake primitive shared between the interrupt context and the
/// receive path.
#[derive(Debug, Default)]
pub struct WakeFlag {
    signaled: AtomicBool,
    cancelled: AtomicBool,
}

impl WakeFlag {
    /// New flag, unset.
    pub const fn new() -> Self {
        Self {
            signaled: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Raise the wake signal.
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    /// Consume a pending signal. Returns whether one was pending.
    pub fn consume(&self) -> bool {
        self.signaled.swap(false, Ordering::AcqRel)
    }

    /// Request cancellation of any current or future wait. Sticky.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Handler-side endpoint: what the platform's interrupt path invokes.
///
/// Holds its own register view so the mask write happens first, in
/// interrupt context, before the waiter resumes.
pub struct IrqBridge<R: Registers> {
    regs: R,
    wake: Arc<WakeFlag>,
}

impl<R: Registers> IrqBridge<R> {
    /// Bind a register view and a wake flag into a handler endpoint.
    pub fn new(regs: R, wake: Arc<WakeFlag>) -> Self {
        Self { regs, wake }
    }

    /// The interrupt handler body: disarm the one-shot mask, wake the
    /// receiver. No ring-index manipulation here.
    pub fn on_interrupt(&self) {
        self.regs.set_irq_mask(false);
        self.wake.signal();
    }
}

impl<R: Registers> Clone for IrqBridge<R> {
    fn clone(&self) -> Self {
        Self {
            regs: self.regs.clone(),
            wake: self.wake.clone(),
        }
    }
}
